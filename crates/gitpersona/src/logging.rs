//! Tracing bootstrap for front ends.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Filter from `RUST_LOG`, or the configured level when unset or invalid.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install a global `fmt` subscriber.
///
/// Returns `false` when a global subscriber was already installed, in
/// which case nothing changes; calling this more than once is harmless.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt::layer().with_target(config.with_target))
        .try_init()
        .is_ok()
}

//! Manager configuration file.
//!
//! ```yaml
//! profiles_dir: /home/me/.config/gitpersona/profiles
//! max_inheritance_depth: 8
//! apply:
//!   target_scope: local
//!   git_program: git
//!   repository: /home/me/src/project
//!   lock_timeout_ms: 10000
//! logging:
//!   level: info
//!   with_target: false
//! ```
//!
//! Every field is optional. `GITPERSONA_PROFILES_DIR` and `GITPERSONA_LOG`
//! override the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use gitpersona_apply::Scope;
use gitpersona_profile::MAX_INHERITANCE_DEPTH;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Overrides [`ManagerConfig::profiles_dir`].
pub const PROFILES_DIR_ENV: &str = "GITPERSONA_PROFILES_DIR";

/// Overrides [`LoggingConfig::level`].
pub const LOG_ENV: &str = "GITPERSONA_LOG";

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Directory holding profile records
    pub profiles_dir: PathBuf,
    /// Longest inheritance chain accepted, at most 8
    pub max_inheritance_depth: usize,
    /// How profiles are applied
    pub apply: ApplyConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Settings for applying profiles to git.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplyConfig {
    /// Scope switches write to
    pub target_scope: Scope,
    /// Git executable
    pub git_program: PathBuf,
    /// Repository whose local configuration is used; the current directory when unset
    pub repository: Option<PathBuf>,
    /// Directory for per-scope lock files; under the profiles directory when unset
    pub lock_dir: Option<PathBuf>,
    /// How long to wait for another switch's lock
    pub lock_timeout_ms: u64,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            target_scope: Scope::Local,
            git_program: PathBuf::from("git"),
            repository: None,
            lock_dir: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Include the event target in output
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            profiles_dir: Self::default_profiles_dir(),
            max_inheritance_depth: MAX_INHERITANCE_DEPTH,
            apply: ApplyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Defaults with records kept in `profiles_dir`.
    pub fn new(profiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            profiles_dir: profiles_dir.into(),
            ..Default::default()
        }
    }

    /// `<config dir>/gitpersona/profiles`, falling back to the working
    /// directory when the platform has no config directory.
    pub fn default_profiles_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gitpersona")
            .join("profiles")
    }

    /// Read a YAML file, apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or the result is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            .with_env_overrides();
        config.validate()?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise use defaults; overrides and
    /// validation apply either way.
    ///
    /// # Errors
    ///
    /// Fails if an existing file is invalid.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default().with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without overrides or validation.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or unknown fields.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Invalid configuration YAML")
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`; empty values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = get(PROFILES_DIR_ENV) {
            self.profiles_dir = PathBuf::from(dir);
        }
        if let Some(level) = get(LOG_ENV) {
            self.logging.level = level;
        }
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Fails if the depth is outside `1..=8`, the lock timeout is zero or the
    /// profiles directory is empty.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_INHERITANCE_DEPTH).contains(&self.max_inheritance_depth) {
            bail!(
                "max_inheritance_depth must be between 1 and {MAX_INHERITANCE_DEPTH}, got {}",
                self.max_inheritance_depth
            );
        }
        if self.apply.lock_timeout_ms == 0 {
            bail!("apply.lock_timeout_ms must be greater than zero");
        }
        if self.profiles_dir.as_os_str().is_empty() {
            bail!("profiles_dir must not be empty");
        }
        Ok(())
    }

    /// Directory for per-scope lock files.
    pub fn lock_dir(&self) -> PathBuf {
        self.apply
            .lock_dir
            .clone()
            .unwrap_or_else(|| self.profiles_dir.join(".locks").join("apply"))
    }

    /// Lock wait as a [`Duration`].
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.apply.lock_timeout_ms)
    }

    /// Set the profiles directory.
    pub fn with_profiles_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profiles_dir = dir.into();
        self
    }

    /// Set the maximum inheritance depth.
    pub fn with_max_inheritance_depth(mut self, depth: usize) -> Self {
        self.max_inheritance_depth = depth;
        self
    }

    /// Set the scope switches write to.
    pub fn with_target_scope(mut self, scope: Scope) -> Self {
        self.apply.target_scope = scope;
        self
    }

    /// Set the git executable.
    pub fn with_git_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.apply.git_program = program.into();
        self
    }

    /// Set the repository for local-scope switches.
    pub fn with_repository(mut self, repository: impl Into<PathBuf>) -> Self {
        self.apply.repository = Some(repository.into());
        self
    }

    /// Set the lock directory.
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.apply.lock_dir = Some(dir.into());
        self
    }

    /// Set the lock wait.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.apply.lock_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the log filter.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }
}

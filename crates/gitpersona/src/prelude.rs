//! Convenience re-exports for front ends.

pub use crate::config::{ApplyConfig, LoggingConfig, ManagerConfig};
pub use crate::error::SwitchError;
pub use crate::logging::init_tracing;
pub use crate::manager::ProfileManager;
pub use crate::result::{DeleteOutcome, SwitchResult};

pub use gitpersona_apply::{ApplyPlan, CancellationToken, ConfigBackend, Scope, SwitchState};
pub use gitpersona_errors::{Classify, ErrorCode, ErrorSeverity};
pub use gitpersona_profile::{Profile, ProfileName, ResolvedProfile};
pub use gitpersona_validation::{ValidationReport, Validator, Violation};

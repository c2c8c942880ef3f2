//! Apply engine errors and rollback reporting.

use core::fmt;

use gitpersona_errors::{BackendError, Classify, ErrorCode, ErrorSeverity, StoreError};
use serde::Serialize;

use crate::scope::Scope;
use crate::transaction::SwitchState;

/// Keys restored and not restored by a rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackReport {
    /// Keys returned to their snapshotted value, in rollback order
    pub restored: Vec<String>,
    /// Keys that could not be returned to their snapshotted value
    pub not_restored: Vec<String>,
}

impl RollbackReport {
    /// Whether every written key was restored.
    pub fn is_complete(&self) -> bool {
        self.not_restored.is_empty()
    }
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rolled back {} key(s)", self.restored.len())?;
        if !self.not_restored.is_empty() {
            write!(f, "; not restored: {}", self.not_restored.join(", "))?;
        }
        Ok(())
    }
}

/// Failures of a transactional apply.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// Cancelled before any key was written
    #[error("switch cancelled while {state}")]
    Cancelled {
        /// Phase in which cancellation was observed
        state: SwitchState,
    },

    /// The scope lock could not be taken
    #[error("could not lock {scope} configuration")]
    Lock {
        /// Scope to be written
        scope: Scope,
        /// Underlying lock failure
        #[source]
        source: StoreError,
    },

    /// Reading a key for the snapshot failed; nothing was written
    #[error("could not read {scope} key '{key}' for the snapshot")]
    Snapshot {
        /// Scope read
        scope: Scope,
        /// Key read
        key: String,
        /// Backend failure
        #[source]
        source: BackendError,
    },

    /// Writing a key failed and the switch was rolled back
    #[error("writing {scope} key '{key}' failed ({rollback})")]
    ApplyFailed {
        /// Scope written
        scope: Scope,
        /// Key whose write failed
        key: String,
        /// Backend failure
        #[source]
        source: BackendError,
        /// Outcome of the rollback
        rollback: RollbackReport,
    },

    /// A written key did not read back as written and the switch was rolled back
    #[error("{scope} key '{key}' did not read back as written ({rollback})")]
    VerifyMismatch {
        /// Scope written
        scope: Scope,
        /// Key that failed verification
        key: String,
        /// Read failure, when the key could not be read back at all
        #[source]
        source: Option<BackendError>,
        /// Outcome of the rollback
        rollback: RollbackReport,
    },

    /// Rollback left keys in an unknown state. Never retried automatically.
    #[error("rollback incomplete, configuration needs manual repair: {report}")]
    RollbackFailed {
        /// The failure that started the rollback
        #[source]
        trigger: Box<ApplyError>,
        /// Outcome of the rollback
        report: RollbackReport,
    },
}

impl ApplyError {
    /// Rollback outcome, when a rollback ran.
    pub fn rollback(&self) -> Option<&RollbackReport> {
        match self {
            ApplyError::ApplyFailed { rollback, .. } | ApplyError::VerifyMismatch { rollback, .. } => {
                Some(rollback)
            }
            ApplyError::RollbackFailed { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Whether external configuration may have changed.
    pub fn touched_configuration(&self) -> bool {
        self.rollback().is_some()
    }
}

impl Classify for ApplyError {
    fn code(&self) -> ErrorCode {
        match self {
            ApplyError::Cancelled { .. } => ErrorCode::Cancelled,
            ApplyError::Lock { source, .. } => source.code(),
            ApplyError::Snapshot { .. } | ApplyError::ApplyFailed { .. } => {
                ErrorCode::ExternalApplyFailed
            }
            ApplyError::VerifyMismatch { .. } => ErrorCode::ExternalVerifyMismatch,
            ApplyError::RollbackFailed { .. } => ErrorCode::RollbackFailed,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            ApplyError::Cancelled { .. } => ErrorSeverity::Info,
            ApplyError::RollbackFailed { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, ApplyError::RollbackFailed { .. })
            && matches!(
                self.code(),
                ErrorCode::LockUnavailable | ErrorCode::Cancelled | ErrorCode::StoreIoError
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(restored: &[&str], not_restored: &[&str]) -> RollbackReport {
        RollbackReport {
            restored: restored.iter().map(|s| s.to_string()).collect(),
            not_restored: not_restored.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_rollback_failed_is_critical_and_not_recoverable() {
        let trigger = ApplyError::VerifyMismatch {
            scope: Scope::Local,
            key: "user.email".into(),
            source: None,
            rollback: report(&["user.name"], &["user.email"]),
        };
        let err = ApplyError::RollbackFailed {
            trigger: Box::new(trigger),
            report: report(&["user.name"], &["user.email"]),
        };
        assert_eq!(err.code(), ErrorCode::RollbackFailed);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_recoverable());
        insta::assert_snapshot!(
            err.to_string(),
            @"rollback incomplete, configuration needs manual repair: rolled back 1 key(s); not restored: user.email"
        );
    }

    #[test]
    fn test_cancelled_touches_nothing() {
        let err = ApplyError::Cancelled {
            state: SwitchState::Snapshotting,
        };
        assert!(!err.touched_configuration());
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "switch cancelled while snapshotting");
    }
}

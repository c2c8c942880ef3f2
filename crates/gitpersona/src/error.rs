//! Errors surfaced by [`ProfileManager`](crate::ProfileManager).

use gitpersona_apply::{ApplyError, SwitchState};
use gitpersona_errors::{Classify, ErrorCode, ErrorSeverity, ProfileError, StoreError};
use gitpersona_profile::ProfileName;
use gitpersona_sensitive::SensitiveError;
use gitpersona_validation::ValidationReport;

/// Any failure of a manager operation.
#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    /// Naming, lookup or inheritance failure
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Record store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Blocking validation violations; the report lists all of them
    #[error("{report}")]
    ValidationBlocked {
        /// Full report, including advisories
        report: Box<ValidationReport>,
    },

    /// The signing key reference could not be resolved
    #[error("signing key reference of profile '{profile}' could not be resolved")]
    ReferenceUnresolvable {
        /// Profile being switched to
        profile: ProfileName,
        /// Resolver failure
        #[source]
        source: SensitiveError,
    },

    /// Cancelled before any configuration was written
    #[error("switch cancelled while {state}")]
    Cancelled {
        /// Phase in which cancellation was observed
        state: SwitchState,
    },

    /// Applying to git failed; see the attached rollback report
    #[error(transparent)]
    Apply(ApplyError),

    /// Invalid manager configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SwitchError {
    /// Wrap a report that has blocking violations.
    pub fn blocked(report: ValidationReport) -> Self {
        SwitchError::ValidationBlocked {
            report: Box::new(report),
        }
    }

    /// The validation report, for [`SwitchError::ValidationBlocked`].
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            SwitchError::ValidationBlocked { report } => Some(report),
            _ => None,
        }
    }
}

impl From<ApplyError> for SwitchError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::Cancelled { state } => SwitchError::Cancelled { state },
            other => SwitchError::Apply(other),
        }
    }
}

impl Classify for SwitchError {
    fn code(&self) -> ErrorCode {
        match self {
            SwitchError::Profile(e) => e.code(),
            SwitchError::Store(e) => e.code(),
            SwitchError::ValidationBlocked { .. } => ErrorCode::ValidationBlocked,
            SwitchError::ReferenceUnresolvable { .. } => ErrorCode::ReferenceUnresolvable,
            SwitchError::Cancelled { .. } => ErrorCode::Cancelled,
            SwitchError::Apply(e) => e.code(),
            SwitchError::Config(_) => ErrorCode::Config,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            SwitchError::Apply(e) => e.severity(),
            SwitchError::Cancelled { .. } => ErrorSeverity::Info,
            SwitchError::ValidationBlocked { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            SwitchError::Apply(e) => e.is_recoverable(),
            _ => matches!(
                self.code(),
                ErrorCode::StoreIoError | ErrorCode::LockUnavailable | ErrorCode::Cancelled
            ),
        }
    }
}

//! Error classification shared by every gitpersona crate.

use core::fmt;

/// Stable, coarse-grained error code.
///
/// Codes are what front ends branch on; the concrete error types carry the
/// details needed for the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Profile (or another named record) does not exist
    NotFound,
    /// A record with that name already exists
    AlreadyExists,
    /// Profile name failed the safe-name rules
    InvalidName,
    /// A stored record could not be decoded
    InvalidFormat,
    /// A profile names a parent that does not exist
    ParentNotFound,
    /// The inheritance chain loops back on itself
    CircularInheritance,
    /// The inheritance chain exceeds the maximum depth
    ChainTooDeep,
    /// Validation reported at least one blocking violation
    ValidationBlocked,
    /// Filesystem failure, generally recoverable by retrying
    StoreIoError,
    /// Filesystem permission failure
    PermissionDenied,
    /// An advisory lock could not be acquired in time
    LockUnavailable,
    /// A secret reference could not be resolved
    ReferenceUnresolvable,
    /// Writing a key to the external configuration failed
    ExternalApplyFailed,
    /// A written key read back with a different value
    ExternalVerifyMismatch,
    /// Rollback left at least one key unrestored
    RollbackFailed,
    /// The caller cancelled the operation before anything changed
    Cancelled,
    /// Invalid configuration of gitpersona itself
    Config,
}

impl ErrorCode {
    /// Return the code as a static string.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NotFound",
            ErrorCode::AlreadyExists => "AlreadyExists",
            ErrorCode::InvalidName => "InvalidName",
            ErrorCode::InvalidFormat => "InvalidFormat",
            ErrorCode::ParentNotFound => "ParentNotFound",
            ErrorCode::CircularInheritance => "CircularInheritance",
            ErrorCode::ChainTooDeep => "ChainTooDeep",
            ErrorCode::ValidationBlocked => "ValidationBlocked",
            ErrorCode::StoreIoError => "StoreIoError",
            ErrorCode::PermissionDenied => "PermissionDenied",
            ErrorCode::LockUnavailable => "LockUnavailable",
            ErrorCode::ReferenceUnresolvable => "ReferenceUnresolvable",
            ErrorCode::ExternalApplyFailed => "ExternalApplyFailed",
            ErrorCode::ExternalVerifyMismatch => "ExternalVerifyMismatch",
            ErrorCode::RollbackFailed => "RollbackFailed",
            ErrorCode::Cancelled => "Cancelled",
            ErrorCode::Config => "Config",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed but state is consistent
    Error = 2,
    /// Critical, external state may be inconsistent and needs manual repair
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Uniform classification over every error type in the workspace.
pub trait Classify {
    /// Coarse error code.
    fn code(&self) -> ErrorCode;

    /// Severity of the failure.
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    /// Whether retrying the same operation may succeed.
    fn is_recoverable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::StoreIoError | ErrorCode::LockUnavailable | ErrorCode::Cancelled
        )
    }
}

//! Atomic store errors.

use std::io;
use std::path::PathBuf;

use crate::common::{Classify, ErrorCode};

/// Errors raised by the on-disk profile store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with that name
    #[error("profile '{name}' not found in store")]
    NotFound {
        /// Profile name
        name: String,
    },

    /// A record with that name already exists
    #[error("profile '{name}' already exists")]
    AlreadyExists {
        /// Profile name
        name: String,
    },

    /// Filesystem failure
    #[error("{operation} failed for {}: {source}", .path.display())]
    Io {
        /// The operation being performed
        operation: &'static str,
        /// The path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Permission denied by the filesystem
    #[error("permission denied: {operation} on {}", .path.display())]
    PermissionDenied {
        /// The operation being performed
        operation: &'static str,
        /// The path involved
        path: PathBuf,
    },

    /// Record could not be decoded or encoded
    #[error("invalid profile record {}: {reason}", .path.display())]
    InvalidFormat {
        /// Record path
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Record uses a schema newer than this build
    #[error("profile record {} uses schema version {found} (max supported: {supported})", .path.display())]
    UnsupportedSchemaVersion {
        /// Record path
        path: PathBuf,
        /// Version found in the record
        found: u32,
        /// Highest supported version
        supported: u32,
    },

    /// A backup could not be confirmed before a destructive operation
    #[error("backup of '{name}' could not be confirmed at {}", .path.display())]
    BackupUnconfirmed {
        /// Profile name
        name: String,
        /// Expected backup path
        path: PathBuf,
    },

    /// An advisory lock could not be taken
    #[error("could not lock {}: {source}", .path.display())]
    LockUnavailable {
        /// Lock file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Wrap an I/O error, mapping permission failures to [`StoreError::PermissionDenied`].
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            StoreError::PermissionDenied { operation, path }
        } else {
            StoreError::Io {
                operation,
                path,
                source,
            }
        }
    }

    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        StoreError::NotFound { name: name.into() }
    }

    /// Create an invalid format error.
    pub fn invalid_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl Classify for StoreError {
    fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotFound { .. } => ErrorCode::NotFound,
            StoreError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            StoreError::Io { .. } => ErrorCode::StoreIoError,
            StoreError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            StoreError::InvalidFormat { .. } | StoreError::UnsupportedSchemaVersion { .. } => {
                ErrorCode::InvalidFormat
            }
            StoreError::BackupUnconfirmed { .. } => ErrorCode::StoreIoError,
            StoreError::LockUnavailable { .. } => ErrorCode::LockUnavailable,
        }
    }
}

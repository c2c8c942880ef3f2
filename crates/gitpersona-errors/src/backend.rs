//! External configuration backend errors.

use std::io;

use crate::common::{Classify, ErrorCode};

/// Errors raised by a configuration backend (`git config` or an in-memory map).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend program could not be started
    #[error("could not run '{program}': {source}")]
    Unavailable {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The backend reported failure for an operation
    #[error("{operation} of {scope} key '{key}' failed (status {status:?}): {message}")]
    CommandFailed {
        /// `get`, `get-all`, `set`, `add` or `unset`
        operation: &'static str,
        /// Scope name
        scope: &'static str,
        /// Configuration key
        key: String,
        /// Exit status, when one was reported
        status: Option<i32>,
        /// Diagnostic output
        message: String,
    },

    /// The scope has no configuration file to read, such as the local
    /// scope outside a repository
    #[error("{scope} configuration is not available: {message}")]
    ScopeUnavailable {
        /// Scope name
        scope: &'static str,
        /// Diagnostic output
        message: String,
    },

    /// Key refused before reaching the backend
    #[error("refusing configuration key '{key}': {reason}")]
    InvalidKey {
        /// Rejected key
        key: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Value refused before reaching the backend
    #[error("refusing value for configuration key '{key}': {reason}")]
    InvalidValue {
        /// Key the value was destined for
        key: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl BackendError {
    /// Create a command failure.
    pub fn command_failed(
        operation: &'static str,
        scope: &'static str,
        key: impl Into<String>,
        status: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        BackendError::CommandFailed {
            operation,
            scope,
            key: key.into(),
            status,
            message: message.into(),
        }
    }
}

impl Classify for BackendError {
    fn code(&self) -> ErrorCode {
        ErrorCode::ExternalApplyFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_names_key_and_scope() {
        let err = BackendError::command_failed("set", "local", "user.email", Some(4), "locked");
        let msg = err.to_string();
        assert!(msg.contains("user.email"));
        assert!(msg.contains("local"));
        assert!(msg.contains("locked"));
    }

    #[test]
    fn test_scope_unavailable_is_an_apply_failure() {
        let err = BackendError::ScopeUnavailable {
            scope: "local",
            message: "not in a git directory".to_string(),
        };
        assert_eq!(err.code(), ErrorCode::ExternalApplyFailed);
        assert!(err.to_string().starts_with("local configuration"));
    }
}

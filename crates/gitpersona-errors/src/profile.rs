//! Profile naming, schema and inheritance errors.

use crate::common::{Classify, ErrorCode};
use crate::store::StoreError;

/// Profile and inheritance errors.
///
/// # Examples
///
/// ```
/// use gitpersona_errors::{Classify, ErrorCode, ProfileError};
///
/// let err = ProfileError::parent_not_found("base", "work");
/// assert_eq!(err.code(), ErrorCode::ParentNotFound);
/// assert!(err.is_inheritance_error());
/// assert!(err.to_string().contains("base"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// Profile not found
    #[error("profile not found: {0}")]
    NotFound(String),

    /// Profile name failed validation
    #[error("invalid profile name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A profile names a parent that does not exist
    #[error("parent profile '{parent}' of '{child}' not found")]
    ParentNotFound {
        /// The missing parent
        parent: String,
        /// The profile that referenced it
        child: String,
    },

    /// Circular inheritance detected
    #[error("circular profile inheritance: {}", .chain.join(" -> "))]
    CircularInheritance {
        /// Chain from the requested profile to the repeated name (inclusive)
        chain: Vec<String>,
    },

    /// Inheritance chain too deep
    #[error("profile inheritance chain too deep: {depth} levels (max: {max_depth})")]
    ChainTooDeep {
        /// Depth reached when the walk stopped
        depth: usize,
        /// Maximum allowed depth
        max_depth: usize,
    },

    /// Record was written by a newer schema
    #[error("unsupported profile schema version {found}: maximum supported is {supported}")]
    UnsupportedSchemaVersion {
        /// Version found in the record
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// Loading a chain member from the store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProfileError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        ProfileError::NotFound(name.into())
    }

    /// Create an invalid name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ProfileError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a parent not found error.
    pub fn parent_not_found(parent: impl Into<String>, child: impl Into<String>) -> Self {
        ProfileError::ParentNotFound {
            parent: parent.into(),
            child: child.into(),
        }
    }

    /// Create a circular inheritance error from the walked chain.
    pub fn circular_inheritance<I, S>(chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProfileError::CircularInheritance {
            chain: chain.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if this error is related to profile inheritance.
    pub fn is_inheritance_error(&self) -> bool {
        matches!(
            self,
            ProfileError::CircularInheritance { .. }
                | ProfileError::ChainTooDeep { .. }
                | ProfileError::ParentNotFound { .. }
        )
    }
}

impl Classify for ProfileError {
    fn code(&self) -> ErrorCode {
        match self {
            ProfileError::NotFound(_) => ErrorCode::NotFound,
            ProfileError::InvalidName { .. } => ErrorCode::InvalidName,
            ProfileError::ParentNotFound { .. } => ErrorCode::ParentNotFound,
            ProfileError::CircularInheritance { .. } => ErrorCode::CircularInheritance,
            ProfileError::ChainTooDeep { .. } => ErrorCode::ChainTooDeep,
            ProfileError::UnsupportedSchemaVersion { .. } => ErrorCode::InvalidFormat,
            ProfileError::Store(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_chain_display() {
        let err = ProfileError::circular_inheritance(["work", "base", "work"]);
        assert_eq!(
            err.to_string(),
            "circular profile inheritance: work -> base -> work"
        );
    }

    #[test]
    fn test_is_inheritance_error() {
        assert!(ProfileError::circular_inheritance(["a", "a"]).is_inheritance_error());
        assert!(
            ProfileError::ChainTooDeep {
                depth: 9,
                max_depth: 8
            }
            .is_inheritance_error()
        );
        assert!(!ProfileError::not_found("x").is_inheritance_error());
    }

    #[test]
    fn test_store_error_code_passes_through() {
        let err: ProfileError = StoreError::not_found("gone").into();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}

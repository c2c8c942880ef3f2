//! Zero-on-release containers for secret-adjacent values.
//!
//! [`SensitiveValue`] owns a byte buffer that is overwritten with zeros
//! before it is released, whether that happens through [`SensitiveValue::dispose`]
//! or on drop. There is no `Display`, `Clone` or `Serialize` path: the only
//! way to render the value is [`SensitiveValue::reveal`], which leaves an
//! audit trail.
//!
//! The [`SecretResolver`] trait is the seam to a secret manager: it turns an
//! opaque reference string into a [`SensitiveValue`].
//!
//! # Example
//!
//! ```
//! use gitpersona_sensitive::{SensitiveError, SensitiveValue};
//!
//! let mut token = SensitiveValue::from_string("hunter2".to_string());
//! assert_eq!(token.expose()?, b"hunter2");
//!
//! token.dispose();
//! assert!(matches!(token.expose(), Err(SensitiveError::AlreadyReleased)));
//! # Ok::<(), SensitiveError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod resolver;
pub mod value;

pub use resolver::{MapSecretResolver, SecretResolver};
pub use value::SensitiveValue;

use gitpersona_errors::{Classify, ErrorCode};

/// Errors raised by sensitive values and secret resolvers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensitiveError {
    /// The value was disposed and its buffer zeroed
    #[error("sensitive value accessed after release")]
    AlreadyReleased,

    /// The value is not valid UTF-8
    #[error("sensitive value is not valid UTF-8")]
    NotUtf8,

    /// The resolver has no secret for this reference
    #[error("secret reference '{reference}' could not be resolved")]
    ReferenceUnresolvable {
        /// The opaque reference
        reference: String,
    },
}

impl Classify for SensitiveError {
    fn code(&self) -> ErrorCode {
        match self {
            SensitiveError::ReferenceUnresolvable { .. } => ErrorCode::ReferenceUnresolvable,
            SensitiveError::AlreadyReleased | SensitiveError::NotUtf8 => ErrorCode::InvalidFormat,
        }
    }
}

//! The [`SensitiveValue`] container.

use core::fmt;

use tracing::info;
use zeroize::Zeroizing;

use crate::SensitiveError;

/// Audit target for [`SensitiveValue::reveal`] events.
pub const AUDIT_TARGET: &str = "gitpersona::audit";

/// A singly-owned secret buffer that is zeroed before release.
///
/// `SensitiveValue` is deliberately not `Clone`: ownership is always
/// singular. Reads hand out borrowed views only.
pub struct SensitiveValue {
    buf: Option<Zeroizing<Vec<u8>>>,
}

impl SensitiveValue {
    /// Take ownership of `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            buf: Some(Zeroizing::new(bytes)),
        }
    }

    /// Take ownership of a string's buffer without copying it.
    pub fn from_string(value: String) -> Self {
        Self::new(value.into_bytes())
    }

    /// Borrow the raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SensitiveError::AlreadyReleased`] after [`dispose`](Self::dispose).
    pub fn expose(&self) -> Result<&[u8], SensitiveError> {
        self.buf
            .as_ref()
            .map(|buf| buf.as_slice())
            .ok_or(SensitiveError::AlreadyReleased)
    }

    /// Borrow the value as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`SensitiveError::AlreadyReleased`] after disposal and
    /// [`SensitiveError::NotUtf8`] for non-UTF-8 contents.
    pub fn expose_str(&self) -> Result<&str, SensitiveError> {
        let bytes = self.expose()?;
        std::str::from_utf8(bytes).map_err(|_utf8| SensitiveError::NotUtf8)
    }

    /// Render the value for output.
    ///
    /// This is the only rendering path and every call is recorded on the
    /// [`AUDIT_TARGET`] log target with the stated purpose (never the value).
    ///
    /// # Errors
    ///
    /// Same as [`expose_str`](Self::expose_str).
    pub fn reveal(&self, purpose: &str) -> Result<&str, SensitiveError> {
        let value = self.expose_str()?;
        info!(target: AUDIT_TARGET, purpose, "sensitive value revealed");
        Ok(value)
    }

    /// Zero and release the buffer now.
    ///
    /// Idempotent; later reads fail with [`SensitiveError::AlreadyReleased`].
    pub fn dispose(&mut self) {
        // Dropping the Zeroizing wrapper clears contents and spare capacity.
        self.buf = None;
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_released(&self) -> bool {
        self.buf.is_none()
    }

    /// Length in bytes; zero once released.
    pub fn len(&self) -> usize {
        self.buf.as_ref().map_or(0, |buf| buf.len())
    }

    /// Whether the buffer is empty or released.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compare against `other` without an early exit on the first differing byte.
    ///
    /// # Errors
    ///
    /// Returns [`SensitiveError::AlreadyReleased`] after disposal.
    pub fn ct_eq(&self, other: &[u8]) -> Result<bool, SensitiveError> {
        let mine = self.expose()?;
        if mine.len() != other.len() {
            return Ok(false);
        }
        let diff = mine
            .iter()
            .zip(other)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        Ok(diff == 0)
    }
}

impl fmt::Debug for SensitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_released() {
            f.write_str("SensitiveValue(<released>)")
        } else {
            f.write_str("SensitiveValue(<redacted>)")
        }
    }
}

impl From<String> for SensitiveValue {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

impl From<Vec<u8>> for SensitiveValue {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

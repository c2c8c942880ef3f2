//! Secret reference resolution.
//!
//! A profile's signing key is stored as an opaque reference. A secret
//! manager integration implements [`SecretResolver`] to turn that reference
//! into the secret itself; the reference is never parsed here.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

use crate::{SensitiveError, SensitiveValue};

/// Resolves opaque secret references into [`SensitiveValue`]s.
pub trait SecretResolver: Send + Sync {
    /// Resolve `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`SensitiveError::ReferenceUnresolvable`] when the reference
    /// is unknown to this resolver.
    fn resolve(&self, reference: &str) -> Result<SensitiveValue, SensitiveError>;
}

/// In-memory resolver backed by a map.
///
/// Stored secrets are zeroed when replaced, removed or dropped.
#[derive(Default)]
pub struct MapSecretResolver {
    secrets: RwLock<HashMap<String, Zeroizing<Vec<u8>>>>,
}

impl MapSecretResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret under `reference`, returning `self` for chaining.
    pub fn with_secret(self, reference: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        self.insert(reference, secret);
        self
    }

    /// Register or replace a secret.
    pub fn insert(&self, reference: impl Into<String>, secret: impl Into<Vec<u8>>) {
        self.secrets
            .write()
            .insert(reference.into(), Zeroizing::new(secret.into()));
    }

    /// Forget a secret. Returns whether it was present.
    pub fn remove(&self, reference: &str) -> bool {
        self.secrets.write().remove(reference).is_some()
    }

    /// Number of registered references.
    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    /// Whether no references are registered.
    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }
}

impl SecretResolver for MapSecretResolver {
    fn resolve(&self, reference: &str) -> Result<SensitiveValue, SensitiveError> {
        let secrets = self.secrets.read();
        match secrets.get(reference) {
            Some(secret) => {
                debug!(reference, "resolved secret reference");
                Ok(SensitiveValue::new(secret.to_vec()))
            }
            None => Err(SensitiveError::ReferenceUnresolvable {
                reference: reference.to_string(),
            }),
        }
    }
}

impl core::fmt::Debug for MapSecretResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MapSecretResolver")
            .field("references", &self.len())
            .finish()
    }
}

//! The external configuration system seam.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use gitpersona_errors::BackendError;
use parking_lot::RwLock;
use tracing::trace;

use crate::scope::Scope;

/// Per-key access to a layered configuration system.
///
/// Implementations must be usable from several threads; a switch only
/// calls them sequentially.
pub trait ConfigBackend: Send + Sync {
    /// Current value of `key` in `scope`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the value cannot be read.
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, BackendError>;

    /// Every value of a multi-valued `key` in `scope`, in file order.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the values cannot be read.
    fn get_all(&self, scope: Scope, key: &str) -> Result<Vec<String>, BackendError>;

    /// Set `key` in `scope`, replacing every existing value.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the value cannot be written.
    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError>;

    /// Append `value` to `key` in `scope`, keeping existing values.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the value cannot be written.
    fn add(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError>;

    /// Remove `key` from `scope`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the key cannot be removed.
    fn unset(&self, scope: Scope, key: &str) -> Result<(), BackendError>;

    /// Set `key` to `value`, or unset it when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Propagates the error of [`set`](Self::set) or [`unset`](Self::unset).
    fn put(&self, scope: Scope, key: &str, value: Option<&str>) -> Result<(), BackendError> {
        match value {
            Some(value) => self.set(scope, key, value),
            None => self.unset(scope, key),
        }
    }

    /// Make `values` the exact value list of `key`: unset when empty,
    /// otherwise set the first and append the rest.
    ///
    /// # Errors
    ///
    /// Propagates the first failing write.
    fn restore(&self, scope: Scope, key: &str, values: &[String]) -> Result<(), BackendError> {
        match values {
            [] => self.unset(scope, key),
            [first, rest @ ..] => {
                self.set(scope, key, first)?;
                rest.iter().try_for_each(|value| self.add(scope, key, value))
            }
        }
    }
}

impl<T: ConfigBackend + ?Sized> ConfigBackend for &T {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(scope, key)
    }

    fn get_all(&self, scope: Scope, key: &str) -> Result<Vec<String>, BackendError> {
        (**self).get_all(scope, key)
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).set(scope, key, value)
    }

    fn add(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).add(scope, key, value)
    }

    fn unset(&self, scope: Scope, key: &str) -> Result<(), BackendError> {
        (**self).unset(scope, key)
    }
}

impl<T: ConfigBackend + ?Sized> ConfigBackend for Arc<T> {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(scope, key)
    }

    fn get_all(&self, scope: Scope, key: &str) -> Result<Vec<String>, BackendError> {
        (**self).get_all(scope, key)
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).set(scope, key, value)
    }

    fn add(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).add(scope, key, value)
    }

    fn unset(&self, scope: Scope, key: &str) -> Result<(), BackendError> {
        (**self).unset(scope, key)
    }
}

impl<T: ConfigBackend + ?Sized> ConfigBackend for Box<T> {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(scope, key)
    }

    fn get_all(&self, scope: Scope, key: &str) -> Result<Vec<String>, BackendError> {
        (**self).get_all(scope, key)
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).set(scope, key, value)
    }

    fn add(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).add(scope, key, value)
    }

    fn unset(&self, scope: Scope, key: &str) -> Result<(), BackendError> {
        (**self).unset(scope, key)
    }
}

type Entries = BTreeMap<(Scope, String), Vec<String>>;

#[derive(Debug, Default)]
struct MemoryState {
    entries: Entries,
    unavailable: BTreeSet<Scope>,
}

/// In-process configuration. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    /// Empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](ConfigBackend::set).
    pub fn with_value(self, scope: Scope, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.state
            .write()
            .entries
            .insert((scope, key.into()), vec![value.into()]);
        self
    }

    /// Builder for a multi-valued key.
    pub fn with_values<I, V>(self, scope: Scope, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() {
            self.state.write().entries.insert((scope, key.into()), values);
        }
        self
    }

    /// Make every operation on `scope` fail with
    /// [`BackendError::ScopeUnavailable`], like the local scope outside a
    /// repository.
    pub fn with_unavailable_scope(self, scope: Scope) -> Self {
        self.state.write().unavailable.insert(scope);
        self
    }

    /// Every key set in `scope`, with its last value.
    pub fn values(&self, scope: Scope) -> BTreeMap<String, String> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|((s, _), _)| *s == scope)
            .filter_map(|((_, key), values)| Some((key.clone(), values.last()?.clone())))
            .collect()
    }

    /// Every value of `key` in `scope`.
    pub fn all_values(&self, scope: Scope, key: &str) -> Vec<String> {
        self.state
            .read()
            .entries
            .get(&(scope, key.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of keys across all scopes.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether no key is set in any scope.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    fn check_scope(&self, scope: Scope) -> Result<(), BackendError> {
        if self.state.read().unavailable.contains(&scope) {
            return Err(BackendError::ScopeUnavailable {
                scope: scope.as_str(),
                message: "scope marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigBackend for MemoryBackend {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<String>, BackendError> {
        self.check_scope(scope)?;
        Ok(self
            .state
            .read()
            .entries
            .get(&(scope, key.to_string()))
            .and_then(|values| values.last().cloned()))
    }

    fn get_all(&self, scope: Scope, key: &str) -> Result<Vec<String>, BackendError> {
        self.check_scope(scope)?;
        Ok(self.all_values(scope, key))
    }

    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        self.check_scope(scope)?;
        trace!(%scope, key, "memory backend set");
        self.state
            .write()
            .entries
            .insert((scope, key.to_string()), vec![value.to_string()]);
        Ok(())
    }

    fn add(&self, scope: Scope, key: &str, value: &str) -> Result<(), BackendError> {
        self.check_scope(scope)?;
        trace!(%scope, key, "memory backend add");
        self.state
            .write()
            .entries
            .entry((scope, key.to_string()))
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    fn unset(&self, scope: Scope, key: &str) -> Result<(), BackendError> {
        self.check_scope(scope)?;
        trace!(%scope, key, "memory backend unset");
        self.state.write().entries.remove(&(scope, key.to_string()));
        Ok(())
    }
}

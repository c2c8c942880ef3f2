//! Point-in-time capture of managed keys.

use std::collections::BTreeMap;

use gitpersona_errors::BackendError;
use tracing::debug;

use crate::backend::ConfigBackend;
use crate::error::ApplyError;
use crate::scope::Scope;

/// Prior values (or absence) of every managed key in every scope.
///
/// Taken immediately before a switch mutates anything and discarded once
/// the switch commits or rolls back; never cached between switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    values: BTreeMap<(Scope, String), Vec<String>>,
}

impl ConfigSnapshot {
    /// Read every value of each of `keys` in every scope.
    ///
    /// A scope other than `target` that has no configuration to read, such
    /// as the local scope outside a repository, is recorded as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Snapshot`] on the first read that fails.
    pub fn capture<B, K>(backend: &B, target: Scope, keys: K) -> Result<Self, ApplyError>
    where
        B: ConfigBackend + ?Sized,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let mut values = BTreeMap::new();
        let mut unavailable = Vec::new();
        for key in keys {
            let key = key.as_ref();
            for scope in Scope::ALL {
                let found = if unavailable.contains(&scope) {
                    Vec::new()
                } else {
                    match backend.get_all(scope, key) {
                        Ok(found) => found,
                        Err(BackendError::ScopeUnavailable { message, .. }) if scope != target => {
                            debug!(%scope, reason = %message, "scope unavailable, treated as empty");
                            unavailable.push(scope);
                            Vec::new()
                        }
                        Err(source) => {
                            return Err(ApplyError::Snapshot {
                                scope,
                                key: key.to_string(),
                                source,
                            });
                        }
                    }
                };
                values.insert((scope, key.to_string()), found);
            }
        }
        debug!(entries = values.len(), "configuration snapshot taken");
        Ok(Self { values })
    }

    /// Effective captured value of `key` in `scope` (the last one when the
    /// key has several); `None` when absent or not captured.
    pub fn get(&self, scope: Scope, key: &str) -> Option<&str> {
        self.all(scope, key).last().map(String::as_str)
    }

    /// Every captured value of `key` in `scope`, in file order.
    pub fn all(&self, scope: Scope, key: &str) -> &[String] {
        self.values
            .get(&(scope, key.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `key` was captured for `scope`.
    pub fn contains(&self, scope: Scope, key: &str) -> bool {
        self.values.contains_key(&(scope, key.to_string()))
    }

    /// Every captured entry with its effective value.
    pub fn iter(&self) -> impl Iterator<Item = (Scope, &str, Option<&str>)> {
        self.values.iter().map(|((scope, key), values)| {
            (*scope, key.as_str(), values.last().map(String::as_str))
        })
    }

    /// Number of captured entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn test_capture_records_absence_per_scope() -> Result<(), ApplyError> {
        let backend = MemoryBackend::new().with_value(Scope::Global, "user.email", "g@x.com");
        let snapshot = ConfigSnapshot::capture(&backend, Scope::Local, ["user.email"])?;

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.contains(Scope::Local, "user.email"));
        assert_eq!(snapshot.get(Scope::Local, "user.email"), None);
        assert_eq!(snapshot.get(Scope::Global, "user.email"), Some("g@x.com"));
        assert!(!snapshot.contains(Scope::Local, "user.name"));
        Ok(())
    }

    #[test]
    fn test_capture_keeps_every_value_of_a_multi_valued_key() -> Result<(), ApplyError> {
        let backend = MemoryBackend::new().with_values(
            Scope::Local,
            "remote.origin.push",
            ["refs/heads/main", "refs/tags/*"],
        );
        let snapshot = ConfigSnapshot::capture(&backend, Scope::Local, ["remote.origin.push"])?;

        assert_eq!(snapshot.all(Scope::Local, "remote.origin.push").len(), 2);
        assert_eq!(snapshot.get(Scope::Local, "remote.origin.push"), Some("refs/tags/*"));
        assert!(snapshot.all(Scope::Global, "remote.origin.push").is_empty());
        Ok(())
    }

    #[test]
    fn test_unavailable_local_scope_is_empty_for_a_global_switch() -> Result<(), ApplyError> {
        let backend = MemoryBackend::new()
            .with_unavailable_scope(Scope::Local)
            .with_value(Scope::Global, "user.email", "g@x.com");
        let snapshot = ConfigSnapshot::capture(&backend, Scope::Global, ["user.email", "user.name"])?;

        assert_eq!(snapshot.len(), 6);
        assert_eq!(snapshot.get(Scope::Local, "user.email"), None);
        assert_eq!(snapshot.get(Scope::Global, "user.email"), Some("g@x.com"));
        Ok(())
    }

    #[test]
    fn test_unavailable_target_scope_fails_the_snapshot() {
        let backend = MemoryBackend::new().with_unavailable_scope(Scope::Local);
        let result = ConfigSnapshot::capture(&backend, Scope::Local, ["user.email"]);
        assert!(matches!(
            result,
            Err(ApplyError::Snapshot {
                scope: Scope::Local,
                source: BackendError::ScopeUnavailable { .. },
                ..
            })
        ));
    }
}

//! Snapshot, apply, verify, and commit or roll back.

use core::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use gitpersona_profile::{ProfileName, ResolvedProfile};
use gitpersona_store::{DEFAULT_LOCK_TIMEOUT, KeyLock, LockRegistry};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::backend::ConfigBackend;
use crate::cancel::CancellationToken;
use crate::error::{ApplyError, RollbackReport};
use crate::plan::{ApplyPlan, PlannedChange, ShadowedKey, affected_keys};
use crate::scope::Scope;
use crate::snapshot::ConfigSnapshot;

/// Phases of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    /// Not started
    Idle,
    /// Loading and merging the inheritance chain
    Resolving,
    /// Running validation rules
    Validating,
    /// Capturing prior values
    Snapshotting,
    /// Writing keys
    Applying,
    /// Reading written keys back
    Verifying,
    /// Every key written and verified
    Committed,
    /// Written keys restored after a failure
    RolledBack,
}

impl SwitchState {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            SwitchState::Idle => "idle",
            SwitchState::Resolving => "resolving",
            SwitchState::Validating => "validating",
            SwitchState::Snapshotting => "snapshotting",
            SwitchState::Applying => "applying",
            SwitchState::Verifying => "verifying",
            SwitchState::Committed => "committed",
            SwitchState::RolledBack => "rolledback",
        }
    }

    /// Whether cancellation may still abort the switch in this phase.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            SwitchState::Idle
                | SwitchState::Resolving
                | SwitchState::Validating
                | SwitchState::Snapshotting
        )
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Profile applied
    pub profile: ProfileName,
    /// Scope written
    pub scope: Scope,
    /// Keys written, in order; empty when the profile was already applied
    pub changes: Vec<PlannedChange>,
    /// Keys a narrower scope still overrides
    pub shadowed: Vec<ShadowedKey>,
    /// Time from snapshot to commit
    pub elapsed: Duration,
}

impl ApplyOutcome {
    /// Keys written, in order.
    pub fn changed_keys(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.key.as_str())
    }
}

/// Prior value of a key, recorded before the key is written.
#[derive(Debug, Clone)]
struct UndoEntry {
    key: String,
    prior: Vec<String>,
}

/// Applies resolved profiles to a [`ConfigBackend`] all-or-nothing.
///
/// Git has no multi-key transaction, so one is built from a snapshot, an
/// undo list and a verification pass. With a lock directory configured, a
/// per-scope file lock is held from snapshot to commit or rollback so
/// concurrent switches cannot interleave their undo lists.
#[derive(Debug)]
pub struct TransactionalApplier<B> {
    backend: B,
    locks: Option<LockRegistry>,
}

impl<B: ConfigBackend> TransactionalApplier<B> {
    /// Applier without cross-process locking.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            locks: None,
        }
    }

    /// Keep per-scope lock files in `dir`, waiting up to `timeout` for them.
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        self.locks = Some(LockRegistry::new(dir, timeout));
        self
    }

    /// Per-scope lock files in `dir` with the default timeout.
    pub fn with_default_locks(self, dir: impl Into<PathBuf>) -> Self {
        self.with_lock_dir(dir, DEFAULT_LOCK_TIMEOUT)
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self, scope: Scope) -> Result<Option<KeyLock>, ApplyError> {
        let Some(locks) = &self.locks else {
            return Ok(None);
        };
        locks
            .lock(&format!("scope-{scope}"))
            .map(Some)
            .map_err(|source| ApplyError::Lock { scope, source })
    }

    /// Snapshot every key a switch of `scope` to `profile` touches.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Snapshot`] if a key cannot be read.
    pub fn snapshot(
        &self,
        profile: &ResolvedProfile,
        scope: Scope,
    ) -> Result<ConfigSnapshot, ApplyError> {
        ConfigSnapshot::capture(&self.backend, scope, affected_keys(profile))
    }

    /// Changes a switch to `profile` would make in `scope`, without writing.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Snapshot`] if a key cannot be read.
    pub fn plan(&self, profile: &ResolvedProfile, scope: Scope) -> Result<ApplyPlan, ApplyError> {
        let snapshot = self.snapshot(profile, scope)?;
        Ok(ApplyPlan::build(profile, scope, &snapshot))
    }

    /// Apply `profile` to `scope`.
    ///
    /// Cancellation is checked up to the end of snapshotting. After the
    /// first write the call always ends committed or rolled back.
    ///
    /// # Errors
    ///
    /// - [`ApplyError::Cancelled`], [`ApplyError::Lock`] or
    ///   [`ApplyError::Snapshot`] before anything is written
    /// - [`ApplyError::ApplyFailed`] or [`ApplyError::VerifyMismatch`] after
    ///   a complete rollback
    /// - [`ApplyError::RollbackFailed`] when the rollback itself failed
    pub fn apply(
        &self,
        profile: &ResolvedProfile,
        scope: Scope,
        cancel: &CancellationToken,
    ) -> Result<ApplyOutcome, ApplyError> {
        let name = &profile.name;
        enter(name, SwitchState::Snapshotting);
        check_cancel(cancel, SwitchState::Snapshotting)?;
        let _lock = self.lock(scope)?;

        let started = Instant::now();
        let snapshot = self.snapshot(profile, scope)?;
        let plan = ApplyPlan::build(profile, scope, &snapshot);
        check_cancel(cancel, SwitchState::Snapshotting)?;

        enter(name, SwitchState::Applying);
        let mut undo: Vec<UndoEntry> = Vec::with_capacity(plan.changes.len());
        for change in &plan.changes {
            undo.push(UndoEntry {
                key: change.key.clone(),
                prior: snapshot.all(scope, &change.key).to_vec(),
            });
            if let Err(source) = self
                .backend
                .put(scope, &change.key, change.new_value.as_deref())
            {
                warn!(profile = %name, %scope, key = %change.key, error = %source, "write failed, rolling back");
                return Err(self.roll_back(name, scope, &undo, |rollback| {
                    ApplyError::ApplyFailed {
                        scope,
                        key: change.key.clone(),
                        source,
                        rollback,
                    }
                }));
            }
            debug!(profile = %name, %scope, key = %change.key, operation = ?change.operation, "key applied");
        }

        enter(name, SwitchState::Verifying);
        for change in &plan.changes {
            let failure = match self.backend.get(scope, &change.key) {
                Ok(found) if found == change.new_value => continue,
                Ok(_) => None,
                Err(source) => Some(source),
            };
            warn!(profile = %name, %scope, key = %change.key, "verification failed, rolling back");
            return Err(self.roll_back(name, scope, &undo, |rollback| {
                ApplyError::VerifyMismatch {
                    scope,
                    key: change.key.clone(),
                    source: failure,
                    rollback,
                }
            }));
        }

        enter(name, SwitchState::Committed);
        for shadowed in &plan.shadowed {
            warn!(
                profile = %name,
                key = %shadowed.key,
                shadowed_by = %shadowed.shadowed_by,
                "written key is overridden by a narrower scope"
            );
        }
        let elapsed = started.elapsed();
        info!(
            profile = %name,
            %scope,
            changed = plan.changes.len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "profile applied"
        );
        Ok(ApplyOutcome {
            profile: plan.profile,
            scope,
            changes: plan.changes,
            shadowed: plan.shadowed,
            elapsed,
        })
    }

    /// Replay `undo` in reverse, then build the error for the failure that
    /// caused it. Each key is attempted once.
    fn roll_back(
        &self,
        name: &ProfileName,
        scope: Scope,
        undo: &[UndoEntry],
        failure: impl FnOnce(RollbackReport) -> ApplyError,
    ) -> ApplyError {
        let mut report = RollbackReport::default();
        for entry in undo.iter().rev() {
            match self.backend.restore(scope, &entry.key, &entry.prior) {
                Ok(()) => {
                    debug!(profile = %name, %scope, key = %entry.key, "key restored");
                    report.restored.push(entry.key.clone());
                }
                Err(err) => {
                    error!(profile = %name, %scope, key = %entry.key, error = %err, "key could not be restored");
                    report.not_restored.push(entry.key.clone());
                }
            }
        }

        if report.is_complete() {
            enter(name, SwitchState::RolledBack);
            info!(profile = %name, %scope, restored = report.restored.len(), "switch rolled back");
            failure(report)
        } else {
            error!(
                profile = %name,
                %scope,
                not_restored = report.not_restored.len(),
                "rollback incomplete, manual repair needed"
            );
            ApplyError::RollbackFailed {
                trigger: Box::new(failure(report.clone())),
                report,
            }
        }
    }
}

fn enter(profile: &ProfileName, state: SwitchState) {
    debug!(profile = %profile, %state, "switch state");
}

fn check_cancel(cancel: &CancellationToken, state: SwitchState) -> Result<(), ApplyError> {
    if cancel.is_cancelled() {
        info!(%state, "switch cancelled");
        return Err(ApplyError::Cancelled { state });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use gitpersona_profile::Profile;

    fn resolved(email: &str) -> Result<ResolvedProfile, gitpersona_errors::ProfileError> {
        Ok(ResolvedProfile::from_record(
            &Profile::new(ProfileName::new("work")?)
                .with_identity_name("W")
                .with_email(email),
        ))
    }

    #[test]
    fn test_apply_then_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let backend = MemoryBackend::new();
        let applier = TransactionalApplier::new(backend.clone());
        let profile = resolved("w@x.com")?;

        let first = applier.apply(&profile, Scope::Local, &CancellationToken::new())?;
        assert_eq!(
            first.changed_keys().collect::<Vec<_>>(),
            vec!["user.name", "user.email"]
        );
        let second = applier.apply(&profile, Scope::Local, &CancellationToken::new())?;
        assert_eq!(second.changed_keys().count(), 0);
        assert_eq!(backend.values(Scope::Local).len(), 2);
        Ok(())
    }

    #[test]
    fn test_cancelled_before_snapshot_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let backend = MemoryBackend::new();
        let applier = TransactionalApplier::new(backend.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = applier.apply(&resolved("w@x.com")?, Scope::Local, &cancel);
        assert!(matches!(
            err,
            Err(ApplyError::Cancelled {
                state: SwitchState::Snapshotting
            })
        ));
        assert!(backend.is_empty());
        Ok(())
    }

    #[test]
    fn test_scope_lock_files_are_created() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let applier = TransactionalApplier::new(MemoryBackend::new())
            .with_lock_dir(dir.path(), Duration::from_millis(50));
        applier.apply(&resolved("w@x.com")?, Scope::Global, &CancellationToken::new())?;
        assert!(dir.path().join("scope-global.lock").exists());
        Ok(())
    }

    #[test]
    fn test_held_scope_lock_blocks_switch() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let _held = gitpersona_store::FileLock::acquire(
            &dir.path().join("scope-local.lock"),
            Duration::from_millis(10),
        )?;
        let backend = MemoryBackend::new();
        let applier = TransactionalApplier::new(backend.clone())
            .with_lock_dir(dir.path(), Duration::from_millis(30));

        let err = applier.apply(&resolved("w@x.com")?, Scope::Local, &CancellationToken::new());
        assert!(matches!(err, Err(ApplyError::Lock { scope: Scope::Local, .. })));
        assert!(backend.is_empty());
        Ok(())
    }
}

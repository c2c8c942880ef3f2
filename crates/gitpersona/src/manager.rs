//! The switch state machine and profile lifecycle.

use core::fmt;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use gitpersona_apply::{
    ApplyPlan, CancellationToken, ConfigBackend, GitCliBackend, Scope, SwitchState,
    TransactionalApplier,
};
use gitpersona_profile::{Profile, ProfileName, ProfileSummary, ResolvedProfile, Resolver};
use gitpersona_sensitive::SecretResolver;
use gitpersona_store::{BackupEntry, ProfileStore, StoreConfig, WriteOutcome};
use gitpersona_validation::{ValidationReport, Validator};
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::error::SwitchError;
use crate::result::{DeleteOutcome, SwitchResult};

/// Entry point for front ends: stores, resolves, validates and switches
/// profiles.
pub struct ProfileManager {
    store: ProfileStore,
    validator: Validator,
    applier: TransactionalApplier<Box<dyn ConfigBackend>>,
    scope: Scope,
    max_depth: usize,
    secrets: Option<Arc<dyn SecretResolver>>,
}

impl ProfileManager {
    /// Open the store and drive git through the configured executable.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Config`] for an invalid configuration and a
    /// store error if the profiles directory cannot be prepared.
    pub fn open(config: &ManagerConfig) -> Result<Self, SwitchError> {
        let mut git = GitCliBackend::new().with_program(&config.apply.git_program);
        if let Some(repository) = &config.apply.repository {
            git = git.with_repository(repository);
        }
        Self::with_backend(config, git)
    }

    /// Open the store and apply through `backend`.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn with_backend(
        config: &ManagerConfig,
        backend: impl ConfigBackend + 'static,
    ) -> Result<Self, SwitchError> {
        config
            .validate()
            .map_err(|e| SwitchError::Config(format!("{e:#}")))?;
        let store = ProfileStore::open(
            StoreConfig::new(&config.profiles_dir).with_lock_timeout(config.lock_timeout()),
        )?;
        let backend: Box<dyn ConfigBackend> = Box::new(backend);
        let applier =
            TransactionalApplier::new(backend).with_lock_dir(config.lock_dir(), config.lock_timeout());
        info!(
            profiles_dir = %config.profiles_dir.display(),
            scope = %config.apply.target_scope,
            "profile manager ready"
        );
        Ok(Self {
            store,
            validator: Validator::new(),
            applier,
            scope: config.apply.target_scope,
            max_depth: config.max_inheritance_depth,
            secrets: None,
        })
    }

    /// Replace the validation rule set.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Require signing key references to resolve through `resolver` before
    /// a switch.
    pub fn with_secret_resolver(mut self, resolver: impl SecretResolver + 'static) -> Self {
        self.secrets = Some(Arc::new(resolver));
        self
    }

    /// Write to `scope` instead of the configured one.
    pub fn with_target_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// The record store.
    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// The validator, for adding or replacing rules.
    pub fn validator_mut(&mut self) -> &mut Validator {
        &mut self.validator
    }

    /// Scope switches write to.
    pub fn target_scope(&self) -> Scope {
        self.scope
    }

    fn resolver(&self) -> Resolver<'_, ProfileStore> {
        Resolver::new(&self.store).with_max_depth(self.max_depth)
    }

    /// Summaries of all stored profiles, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns a store error if the directory cannot be listed.
    pub fn list(&self) -> Result<Vec<ProfileSummary>, SwitchError> {
        Ok(self.store.list()?)
    }

    /// The stored record for `name`.
    ///
    /// # Errors
    ///
    /// Returns a store error, including not-found.
    pub fn get(&self, name: &ProfileName) -> Result<Profile, SwitchError> {
        Ok(self.store.read(name)?)
    }

    /// Check a record before it is stored: record-local rules, then the
    /// chain it would be part of, including every profile inheriting from it.
    fn check_record(&self, profile: &Profile) -> Result<(), SwitchError> {
        let report = self.validator.validate_record(profile);
        if !report.is_acceptable() {
            return Err(SwitchError::blocked(report));
        }
        let resolver = self.resolver().with_overlay(profile);
        resolver.resolve(&profile.name)?;
        for descendant in self.descendants(&profile.name)? {
            resolver.resolve(&descendant)?;
        }
        Ok(())
    }

    fn descendants(&self, name: &ProfileName) -> Result<Vec<ProfileName>, SwitchError> {
        let mut seen: HashSet<ProfileName> = HashSet::new();
        let mut queue = VecDeque::from([name.clone()]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for child in self.store.children_of(&current)? {
                if &child != name && seen.insert(child.clone()) {
                    queue.push_back(child.clone());
                    out.push(child);
                }
            }
        }
        Ok(out)
    }

    /// Store a new profile.
    ///
    /// # Errors
    ///
    /// - [`SwitchError::ValidationBlocked`] if a record-local rule blocks
    /// - a profile error if the parent is missing or the chain is cyclic or too deep
    /// - a store error if the name exists or the write fails
    pub fn create(&self, profile: &Profile) -> Result<WriteOutcome, SwitchError> {
        self.check_record(profile)?;
        let outcome = self.store.create(profile)?;
        info!(profile = %profile.name, "profile created");
        Ok(outcome)
    }

    /// Replace a stored profile with `profile`, validating it first.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create), with not-found instead of already-exists.
    pub fn update(&self, profile: &Profile) -> Result<WriteOutcome, SwitchError> {
        self.check_record(profile)?;
        let outcome = self.store.replace(profile)?;
        info!(profile = %profile.name, backup = ?outcome.backup, "profile updated");
        Ok(outcome)
    }

    /// Delete `name` after backing it up. Profiles inheriting from it are
    /// left in place and reported.
    ///
    /// # Errors
    ///
    /// Returns a store error if the record is missing or the backup fails.
    pub fn delete(&self, name: &ProfileName) -> Result<DeleteOutcome, SwitchError> {
        let orphaned_children = self.store.children_of(name)?;
        let backup = self.store.delete(name)?;
        if !orphaned_children.is_empty() {
            warn!(
                profile = %name,
                children = orphaned_children.len(),
                "deleted profile still has children"
            );
        }
        Ok(DeleteOutcome {
            profile: name.clone(),
            backup,
            orphaned_children,
        })
    }

    /// Backups of `name`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backup directory cannot be listed.
    pub fn backups(&self, name: &ProfileName) -> Result<Vec<BackupEntry>, SwitchError> {
        Ok(self.store.backups(name)?)
    }

    /// Restore `name` from one of its backups.
    ///
    /// # Errors
    ///
    /// Returns a store error if `backup` is not a backup of `name` or the
    /// write fails.
    pub fn restore(&self, name: &ProfileName, backup: &Path) -> Result<WriteOutcome, SwitchError> {
        Ok(self.store.restore(name, backup)?)
    }

    /// Merge `name` with its ancestors.
    ///
    /// # Errors
    ///
    /// Returns a profile error for missing profiles, cycles and overlong chains.
    pub fn resolve(&self, name: &ProfileName) -> Result<ResolvedProfile, SwitchError> {
        Ok(self.resolver().resolve(name)?)
    }

    /// Resolve and validate `name`. Blocking violations are reported, not
    /// returned as an error.
    ///
    /// # Errors
    ///
    /// Returns a profile error if `name` cannot be resolved.
    pub fn validate(&self, name: &ProfileName) -> Result<ValidationReport, SwitchError> {
        let resolved = self.resolve(name)?;
        Ok(self.validator.validate(&resolved))
    }

    /// The changes [`switch`](Self::switch) would make, without writing.
    ///
    /// # Errors
    ///
    /// As [`switch`](Self::switch), up to and including snapshotting.
    pub fn plan(&self, name: &ProfileName) -> Result<ApplyPlan, SwitchError> {
        let (resolved, _) = self.prepare(name, &CancellationToken::new())?;
        Ok(self.applier.plan(&resolved, self.scope)?)
    }

    /// Make `name` the active profile.
    ///
    /// # Errors
    ///
    /// See [`switch_with`](Self::switch_with).
    pub fn switch(&self, name: &ProfileName) -> Result<SwitchResult, SwitchError> {
        self.switch_with(name, &CancellationToken::new())
    }

    /// Make `name` the active profile, honoring `cancel` until the first
    /// key is written.
    ///
    /// # Errors
    ///
    /// - a profile error while resolving
    /// - [`SwitchError::ValidationBlocked`] listing every blocking violation
    /// - [`SwitchError::ReferenceUnresolvable`] if a configured secret
    ///   resolver does not know the signing key reference
    /// - [`SwitchError::Cancelled`] before anything is written
    /// - [`SwitchError::Apply`] after a rollback, or when rollback failed
    pub fn switch_with(
        &self,
        name: &ProfileName,
        cancel: &CancellationToken,
    ) -> Result<SwitchResult, SwitchError> {
        info!(profile = %name, scope = %self.scope, "switching profile");
        let (resolved, report) = self.prepare(name, cancel)?;
        let outcome = self.applier.apply(&resolved, self.scope, cancel)?;
        let result = SwitchResult::new(outcome, &resolved, &report);
        info!(
            profile = %name,
            changed = result.changed_keys.len(),
            advisories = result.advisories.len(),
            "switch committed"
        );
        Ok(result)
    }

    /// Resolving and validating phases of a switch.
    fn prepare(
        &self,
        name: &ProfileName,
        cancel: &CancellationToken,
    ) -> Result<(ResolvedProfile, ValidationReport), SwitchError> {
        enter(name, SwitchState::Resolving, cancel)?;
        let resolved = self.resolve(name)?;

        enter(name, SwitchState::Validating, cancel)?;
        let report = self.validator.validate(&resolved);
        if !report.is_acceptable() {
            warn!(
                profile = %name,
                blocking = report.blocking().count(),
                "switch blocked by validation"
            );
            return Err(SwitchError::blocked(report));
        }
        self.check_signing_reference(&resolved)?;
        Ok((resolved, report))
    }

    /// Resolve the signing key reference through the configured resolver
    /// and release the secret immediately.
    fn check_signing_reference(&self, resolved: &ResolvedProfile) -> Result<(), SwitchError> {
        let (Some(secrets), Some(reference)) = (
            &self.secrets,
            resolved.signing.as_ref().and_then(|s| s.key.as_deref()),
        ) else {
            return Ok(());
        };
        let mut secret =
            secrets
                .resolve(reference)
                .map_err(|source| SwitchError::ReferenceUnresolvable {
                    profile: resolved.name.clone(),
                    source,
                })?;
        secret.dispose();
        debug!(profile = %resolved.name, "signing key reference resolved");
        Ok(())
    }
}

fn enter(
    name: &ProfileName,
    state: SwitchState,
    cancel: &CancellationToken,
) -> Result<(), SwitchError> {
    if cancel.is_cancelled() {
        info!(profile = %name, %state, "switch cancelled");
        return Err(SwitchError::Cancelled { state });
    }
    debug!(profile = %name, %state, "switch state");
    Ok(())
}

impl fmt::Debug for ProfileManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileManager")
            .field("root", &self.store.root())
            .field("scope", &self.scope)
            .field("max_depth", &self.max_depth)
            .field("validator", &self.validator)
            .field("secret_resolver", &self.secrets.is_some())
            .finish_non_exhaustive()
    }
}

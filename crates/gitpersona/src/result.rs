//! Outcomes reported to front ends.

use core::fmt;
use std::path::PathBuf;

use gitpersona_apply::{ApplyOutcome, Scope, ShadowedKey, SwitchState};
use gitpersona_profile::{ProfileName, ResolvedProfile};
use gitpersona_validation::{ValidationReport, Violation};
use serde::Serialize;

/// A committed switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchResult {
    /// Profile now active
    pub profile: ProfileName,
    /// Inheritance chain, leaf first
    pub inheritance_chain: Vec<ProfileName>,
    /// Scope written
    pub scope: Scope,
    /// Always [`SwitchState::Committed`]
    pub state: SwitchState,
    /// Keys written, in order; empty when the profile was already active
    pub changed_keys: Vec<String>,
    /// Advisory violations found during validation
    pub advisories: Vec<Violation>,
    /// Written keys that a narrower scope still overrides
    pub shadowed: Vec<ShadowedKey>,
    /// Time from snapshot to commit
    pub elapsed_ms: u64,
}

impl SwitchResult {
    pub(crate) fn new(
        outcome: ApplyOutcome,
        resolved: &ResolvedProfile,
        report: &ValidationReport,
    ) -> Self {
        Self {
            changed_keys: outcome.changed_keys().map(str::to_string).collect(),
            profile: outcome.profile,
            inheritance_chain: resolved.inheritance_chain.clone(),
            scope: outcome.scope,
            state: SwitchState::Committed,
            advisories: report.advisories().cloned().collect(),
            shadowed: outcome.shadowed,
            elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the switch wrote anything.
    pub fn changed(&self) -> bool {
        !self.changed_keys.is_empty()
    }
}

impl fmt::Display for SwitchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changed_keys.is_empty() {
            write!(
                f,
                "profile '{}' is already active in {} configuration",
                self.profile, self.scope
            )?;
        } else {
            write!(
                f,
                "switched to profile '{}' in {} configuration: {} key(s) changed in {} ms",
                self.profile,
                self.scope,
                self.changed_keys.len(),
                self.elapsed_ms
            )?;
            for key in &self.changed_keys {
                write!(f, "\n  {key}")?;
            }
        }
        for advisory in &self.advisories {
            write!(f, "\n  {advisory}")?;
        }
        for key in &self.shadowed {
            write!(
                f,
                "\n  note: {} is overridden by {} configuration",
                key.key, key.shadowed_by
            )?;
        }
        Ok(())
    }
}

/// A deleted profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Profile removed
    pub profile: ProfileName,
    /// Backup written before removal
    pub backup: PathBuf,
    /// Profiles that named the deleted one as parent and no longer resolve
    pub orphaned_children: Vec<ProfileName>,
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deleted profile '{}' (backup: {})",
            self.profile,
            self.backup.display()
        )?;
        if !self.orphaned_children.is_empty() {
            let names: Vec<&str> = self.orphaned_children.iter().map(ProfileName::as_str).collect();
            write!(f, "; profiles left without a parent: {}", names.join(", "))?;
        }
        Ok(())
    }
}

//! Mapping a resolved profile onto git keys and diffing against a snapshot.

use core::fmt;

use gitpersona_profile::keys;
use gitpersona_profile::{ProfileName, ResolvedProfile, SigningMethod};
use serde::Serialize;
use tracing::warn;

use crate::scope::Scope;
use crate::snapshot::ConfigSnapshot;

/// Program git runs for x509-format signing when the method is keyless.
pub const KEYLESS_SIGNING_PROGRAM: &str = "gitsign";

/// `gpg.format` value for a signing method.
pub fn signing_format(method: SigningMethod) -> &'static str {
    match method {
        SigningMethod::Ssh => "ssh",
        SigningMethod::Gpg => "openpgp",
        SigningMethod::X509 | SigningMethod::Keyless => "x509",
    }
}

/// Desired value of every key the profile controls, in application order.
///
/// Managed keys come first in their fixed order, `None` meaning the key
/// must be absent; extension keys follow in lexicographic order.
pub fn desired_values(profile: &ResolvedProfile) -> Vec<(String, Option<String>)> {
    let method = profile.signing.as_ref().and_then(|s| s.method);
    let signing = profile.signing.as_ref().filter(|_| method.is_some());
    let flag = |b: bool| b.to_string();

    let managed = [
        (keys::USER_NAME, profile.identity.name.clone()),
        (keys::USER_EMAIL, profile.identity.email.clone()),
        (keys::GPG_FORMAT, method.map(|m| signing_format(m).to_string())),
        (
            keys::GPG_X509_PROGRAM,
            (method == Some(SigningMethod::Keyless)).then(|| KEYLESS_SIGNING_PROGRAM.to_string()),
        ),
        (
            keys::USER_SIGNINGKEY,
            signing
                .filter(|_| method.is_some_and(SigningMethod::requires_key))
                .and_then(|s| s.key.clone()),
        ),
        (
            keys::COMMIT_GPGSIGN,
            signing.map(|s| flag(s.sign_commits.unwrap_or(true))),
        ),
        (
            keys::TAG_GPGSIGN,
            signing.and_then(|s| s.sign_tags).map(flag),
        ),
    ];

    let mut desired: Vec<(String, Option<String>)> = managed
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    for (key, value) in &profile.extensions {
        if keys::is_managed(key) {
            warn!(key = %key, profile = %profile.name, "ignoring extension that shadows a managed key");
            continue;
        }
        desired.push((key.clone(), Some(value.to_string())));
    }
    desired
}

/// Every key a switch to `profile` reads or writes.
pub fn affected_keys(profile: &ResolvedProfile) -> Vec<String> {
    desired_values(profile).into_iter().map(|(key, _)| key).collect()
}

/// Kind of change to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    /// Key was absent and is set
    Add,
    /// Key had a different value
    Modify,
    /// Key is removed
    Remove,
}

impl ChangeOperation {
    fn symbol(self) -> char {
        match self {
            ChangeOperation::Add => '+',
            ChangeOperation::Modify => '~',
            ChangeOperation::Remove => '-',
        }
    }
}

/// One key a switch will write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    /// Git configuration key
    pub key: String,
    /// Scope written
    pub scope: Scope,
    /// Value before the switch
    pub old_value: Option<String>,
    /// Value after the switch; `None` unsets
    pub new_value: Option<String>,
    /// Add, modify or remove
    pub operation: ChangeOperation,
}

/// A key written to a broad scope that a narrower scope overrides, so
/// git will not see the written value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowedKey {
    /// Git configuration key
    pub key: String,
    /// Narrower scope holding a different value
    pub shadowed_by: Scope,
}

/// What a switch would change, computed from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyPlan {
    /// Profile being applied
    pub profile: ProfileName,
    /// Scope written
    pub scope: Scope,
    /// Changes in application order; keys already at their desired value
    /// are left out
    pub changes: Vec<PlannedChange>,
    /// Keys whose effective value will still differ after the switch
    pub shadowed: Vec<ShadowedKey>,
}

impl ApplyPlan {
    /// Diff `profile` against the `scope` values in `snapshot`.
    pub fn build(profile: &ResolvedProfile, scope: Scope, snapshot: &ConfigSnapshot) -> Self {
        let mut changes = Vec::new();
        let mut shadowed = Vec::new();

        for (key, desired) in desired_values(profile) {
            let current = snapshot.get(scope, &key);
            let multi_valued = snapshot.all(scope, &key).len() > 1;

            if let Some(value) = desired.as_deref() {
                if let Some(by) = scope
                    .narrower()
                    .find(|narrow| snapshot.get(*narrow, &key).is_some_and(|v| v != value))
                {
                    shadowed.push(ShadowedKey {
                        key: key.clone(),
                        shadowed_by: by,
                    });
                }
            }

            let operation = match (current, desired.as_deref()) {
                (None, None) => continue,
                (Some(old), Some(new)) if old == new && !multi_valued => continue,
                (None, Some(_)) => ChangeOperation::Add,
                (Some(_), Some(_)) => ChangeOperation::Modify,
                (Some(_), None) => ChangeOperation::Remove,
            };
            changes.push(PlannedChange {
                old_value: current.map(str::to_string),
                key,
                scope,
                new_value: desired,
                operation,
            });
        }

        Self {
            profile: profile.name.clone(),
            scope,
            changes,
            shadowed,
        }
    }

    /// Whether the switch would write nothing.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Keys that would be written, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.key.as_str())
    }
}

impl fmt::Display for ApplyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changes.is_empty() {
            write!(
                f,
                "profile '{}' is already applied to {} configuration",
                self.profile, self.scope
            )?;
        } else {
            write!(
                f,
                "profile '{}' would change {} {} key(s):",
                self.profile,
                self.changes.len(),
                self.scope
            )?;
            for change in &self.changes {
                write!(f, "\n  {} {}", change.operation.symbol(), change.key)?;
            }
        }
        for key in &self.shadowed {
            write!(
                f,
                "\n  ! {} is overridden by {} configuration",
                key.key, key.shadowed_by
            )?;
        }
        Ok(())
    }
}

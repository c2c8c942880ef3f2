//! Inheritance resolution.
//!
//! A profile is resolved by walking its `parent` links with a visited set,
//! then merging the chain root to leaf field by field. Every merged field
//! records which profile supplied it.

use std::collections::{BTreeMap, HashMap, HashSet};

use gitpersona_errors::{ProfileError, StoreError};
use serde::Serialize;
use tracing::debug;

use crate::types::{Identity, Profile, ProfileName, ScalarValue, SigningConfig};

/// Maximum number of profiles in one inheritance chain, leaf included.
pub const MAX_INHERITANCE_DEPTH: usize = 8;

/// Field paths used as provenance keys.
pub mod fields {
    /// `identity.name`
    pub const IDENTITY_NAME: &str = "identity.name";
    /// `identity.email`
    pub const IDENTITY_EMAIL: &str = "identity.email";
    /// `signing.method`
    pub const SIGNING_METHOD: &str = "signing.method";
    /// `signing.key`
    pub const SIGNING_KEY: &str = "signing.key";
    /// `signing.sign_commits`
    pub const SIGNING_SIGN_COMMITS: &str = "signing.sign_commits";
    /// `signing.sign_tags`
    pub const SIGNING_SIGN_TAGS: &str = "signing.sign_tags";

    /// Provenance path of an extension key.
    pub fn extension(key: &str) -> String {
        format!("extensions.{key}")
    }
}

/// Source of stored profiles for resolution.
pub trait ProfileSource {
    /// Load a profile, returning `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns the underlying store error when the record exists but cannot
    /// be read.
    fn load(&self, name: &ProfileName) -> Result<Option<Profile>, StoreError>;
}

impl<T: ProfileSource + ?Sized> ProfileSource for &T {
    fn load(&self, name: &ProfileName) -> Result<Option<Profile>, StoreError> {
        (**self).load(name)
    }
}

/// In-memory profile source.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileSource {
    profiles: HashMap<ProfileName, Profile>,
}

impl InMemoryProfileSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Remove a profile.
    pub fn remove(&mut self, name: &str) -> Option<Profile> {
        self.profiles.remove(name)
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the source is empty.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<Profile> for InMemoryProfileSource {
    fn from_iter<I: IntoIterator<Item = Profile>>(iter: I) -> Self {
        let mut source = Self::new();
        for profile in iter {
            source.insert(profile);
        }
        source
    }
}

impl ProfileSource for InMemoryProfileSource {
    fn load(&self, name: &ProfileName) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.get(name).cloned())
    }
}

/// Map from field path to the profile that supplied the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Provenance(BTreeMap<String, ProfileName>);

impl Provenance {
    /// Profile that supplied `field`.
    pub fn source_of(&self, field: &str) -> Option<&ProfileName> {
        self.0.get(field)
    }

    /// Iterate in field-path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProfileName)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of recorded fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn record(&mut self, field: impl Into<String>, source: &ProfileName) {
        self.0.insert(field.into(), source.clone());
    }
}

/// A profile merged with its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProfile {
    /// The requested (leaf) profile
    pub name: ProfileName,
    /// Effective identity
    pub identity: Identity,
    /// Effective signing group; `None` when no chain member sets any field
    pub signing: Option<SigningConfig>,
    /// Effective extension keys
    pub extensions: BTreeMap<String, ScalarValue>,
    /// Chain from leaf to root (leaf first, root last)
    pub inheritance_chain: Vec<ProfileName>,
    /// Which chain member supplied each field
    pub provenance: Provenance,
}

impl ResolvedProfile {
    /// View a single record on its own, ignoring its parent.
    pub fn from_record(profile: &Profile) -> Self {
        merge(profile.name.clone(), std::slice::from_ref(profile))
    }

    /// Every set textual field as `(field path, value)`, in a stable order.
    pub fn field_values(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(name) = &self.identity.name {
            out.push((fields::IDENTITY_NAME.to_string(), name.clone()));
        }
        if let Some(email) = &self.identity.email {
            out.push((fields::IDENTITY_EMAIL.to_string(), email.clone()));
        }
        if let Some(signing) = &self.signing {
            if let Some(method) = signing.method {
                out.push((fields::SIGNING_METHOD.to_string(), method.to_string()));
            }
            if let Some(key) = &signing.key {
                out.push((fields::SIGNING_KEY.to_string(), key.clone()));
            }
        }
        for (key, value) in &self.extensions {
            out.push((fields::extension(key), value.to_string()));
        }
        out
    }
}

/// Resolves profiles against a [`ProfileSource`].
pub struct Resolver<'a, S: ?Sized> {
    source: &'a S,
    max_depth: usize,
    overlay: Option<&'a Profile>,
}

impl<'a, S: ProfileSource + ?Sized> Resolver<'a, S> {
    /// Create a resolver with the default maximum depth.
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            max_depth: MAX_INHERITANCE_DEPTH,
            overlay: None,
        }
    }

    /// Lower the maximum chain length. Values above
    /// [`MAX_INHERITANCE_DEPTH`] are clamped, and zero is treated as one.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.clamp(1, MAX_INHERITANCE_DEPTH);
        self
    }

    /// Resolve as if `candidate` were already stored under its name.
    pub fn with_overlay(mut self, candidate: &'a Profile) -> Self {
        self.overlay = Some(candidate);
        self
    }

    fn load(&self, name: &ProfileName) -> Result<Option<Profile>, ProfileError> {
        if let Some(candidate) = self.overlay {
            if &candidate.name == name {
                return Ok(Some(candidate.clone()));
            }
        }
        Ok(self.source.load(name)?)
    }

    /// Resolve `name`.
    ///
    /// # Errors
    ///
    /// - [`ProfileError::NotFound`] if `name` does not exist
    /// - [`ProfileError::ParentNotFound`] if a chain member names a missing parent
    /// - [`ProfileError::CircularInheritance`] if a name recurs
    /// - [`ProfileError::ChainTooDeep`] if the chain exceeds the maximum depth
    /// - [`ProfileError::Store`] if loading a chain member fails
    pub fn resolve(&self, name: &ProfileName) -> Result<ResolvedProfile, ProfileError> {
        let leaf = self
            .load(name)?
            .ok_or_else(|| ProfileError::not_found(name.as_str()))?;

        let mut visited = HashSet::new();
        visited.insert(leaf.name.clone());
        let mut chain = vec![leaf];

        loop {
            let Some(current) = chain.last() else {
                return Err(ProfileError::not_found(name.as_str()));
            };
            let Some(parent) = current.parent.clone() else {
                break;
            };

            if visited.contains(&parent) {
                let mut names: Vec<String> =
                    chain.iter().map(|p| p.name.as_str().to_string()).collect();
                names.push(parent.into_string());
                return Err(ProfileError::CircularInheritance { chain: names });
            }

            if chain.len() >= self.max_depth {
                return Err(ProfileError::ChainTooDeep {
                    depth: chain.len() + 1,
                    max_depth: self.max_depth,
                });
            }

            let child = current.name.as_str().to_string();
            let profile = self
                .load(&parent)?
                .ok_or_else(|| ProfileError::parent_not_found(parent.as_str(), child))?;
            visited.insert(parent);
            chain.push(profile);
        }

        let resolved = merge(name.clone(), &chain);
        debug!(
            profile = %resolved.name,
            depth = resolved.inheritance_chain.len(),
            fields = resolved.provenance.len(),
            "resolved profile"
        );
        Ok(resolved)
    }
}

/// Resolve `name` with default settings.
///
/// # Errors
///
/// See [`Resolver::resolve`].
pub fn resolve<S: ProfileSource + ?Sized>(
    source: &S,
    name: &ProfileName,
) -> Result<ResolvedProfile, ProfileError> {
    Resolver::new(source).resolve(name)
}

/// Merge a leaf-first chain, applying the root first.
fn merge(name: ProfileName, chain: &[Profile]) -> ResolvedProfile {
    let mut identity = Identity::default();
    let mut signing = SigningConfig::default();
    let mut extensions = BTreeMap::new();
    let mut provenance = Provenance::default();

    for profile in chain.iter().rev() {
        let source = &profile.name;

        if let Some(name) = &profile.identity.name {
            identity.name = Some(name.clone());
            provenance.record(fields::IDENTITY_NAME, source);
        }
        if let Some(email) = &profile.identity.email {
            identity.email = Some(email.clone());
            provenance.record(fields::IDENTITY_EMAIL, source);
        }

        if let Some(group) = &profile.signing {
            if let Some(method) = group.method {
                signing.method = Some(method);
                provenance.record(fields::SIGNING_METHOD, source);
            }
            if let Some(key) = &group.key {
                signing.key = Some(key.clone());
                provenance.record(fields::SIGNING_KEY, source);
            }
            if let Some(sign) = group.sign_commits {
                signing.sign_commits = Some(sign);
                provenance.record(fields::SIGNING_SIGN_COMMITS, source);
            }
            if let Some(sign) = group.sign_tags {
                signing.sign_tags = Some(sign);
                provenance.record(fields::SIGNING_SIGN_TAGS, source);
            }
        }

        for (key, value) in &profile.extensions {
            extensions.insert(key.clone(), value.clone());
            provenance.record(fields::extension(key), source);
        }
    }

    // A group with every field unset is the same as no group.
    let signing = (!signing.is_empty()).then_some(signing);

    ResolvedProfile {
        name,
        identity,
        signing,
        extensions,
        inheritance_chain: chain.iter().map(|p| p.name.clone()).collect(),
        provenance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SigningMethod;
    use gitpersona_errors::{Classify, ErrorCode};

    fn name(s: &str) -> ProfileName {
        match ProfileName::new(s) {
            Ok(n) => n,
            Err(e) => panic!("bad test name: {e}"),
        }
    }

    fn child(n: &str, parent: &str) -> Profile {
        Profile::new(name(n)).with_parent(name(parent))
    }

    #[test]
    fn test_base_work_provenance() -> Result<(), ProfileError> {
        let source: InMemoryProfileSource = [
            Profile::new(name("base")).with_email("a@x.com"),
            child("work", "base").with_identity_name("W"),
        ]
        .into_iter()
        .collect();

        let resolved = resolve(&source, &name("work"))?;
        assert_eq!(resolved.identity.name.as_deref(), Some("W"));
        assert_eq!(resolved.identity.email.as_deref(), Some("a@x.com"));
        assert_eq!(
            resolved.provenance.source_of(fields::IDENTITY_NAME),
            Some(&name("work"))
        );
        assert_eq!(
            resolved.provenance.source_of(fields::IDENTITY_EMAIL),
            Some(&name("base"))
        );
        assert_eq!(resolved.inheritance_chain, vec![name("work"), name("base")]);
        Ok(())
    }

    #[test]
    fn test_signing_merges_field_by_field() -> Result<(), ProfileError> {
        let source: InMemoryProfileSource = [
            Profile::new(name("base")).with_signing(
                SigningConfig::with_method(SigningMethod::Ssh)
                    .key("~/.ssh/base.pub")
                    .sign_commits(true),
            ),
            child("work", "base").with_signing(SigningConfig::default().key("~/.ssh/work.pub")),
        ]
        .into_iter()
        .collect();

        let resolved = resolve(&source, &name("work"))?;
        let signing = resolved.signing.unwrap_or_default();
        assert_eq!(signing.method, Some(SigningMethod::Ssh));
        assert_eq!(signing.key.as_deref(), Some("~/.ssh/work.pub"));
        assert_eq!(signing.sign_commits, Some(true));
        assert_eq!(
            resolved.provenance.source_of(fields::SIGNING_KEY),
            Some(&name("work"))
        );
        assert_eq!(
            resolved.provenance.source_of(fields::SIGNING_METHOD),
            Some(&name("base"))
        );
        Ok(())
    }

    #[test]
    fn test_empty_signing_group_is_absent() -> Result<(), ProfileError> {
        let source: InMemoryProfileSource =
            [Profile::new(name("solo")).with_signing(SigningConfig::default())]
                .into_iter()
                .collect();
        let resolved = resolve(&source, &name("solo"))?;
        assert!(resolved.signing.is_none());
        assert!(resolved.provenance.is_empty());
        Ok(())
    }

    #[test]
    fn test_self_parent_is_one_element_cycle() {
        let source: InMemoryProfileSource = [child("loop", "loop")].into_iter().collect();
        let err = resolve(&source, &name("loop"));
        assert!(matches!(
            err,
            Err(ProfileError::CircularInheritance { ref chain }) if chain == &["loop", "loop"]
        ));
    }

    #[test]
    fn test_two_element_cycle_reports_chain() {
        let source: InMemoryProfileSource =
            [child("a", "b"), child("b", "a")].into_iter().collect();
        let err = resolve(&source, &name("a"));
        assert!(matches!(
            err,
            Err(ProfileError::CircularInheritance { ref chain }) if chain == &["a", "b", "a"]
        ));
    }

    #[test]
    fn test_missing_leaf_and_parent() {
        let source: InMemoryProfileSource = [child("orphan", "gone")].into_iter().collect();

        let err = resolve(&source, &name("nobody"));
        assert!(matches!(&err, Err(e) if e.code() == ErrorCode::NotFound));

        let err = resolve(&source, &name("orphan"));
        assert!(matches!(
            err,
            Err(ProfileError::ParentNotFound { ref parent, ref child }) if parent == "gone" && child == "orphan"
        ));
    }

    fn linear_chain(len: usize) -> InMemoryProfileSource {
        (0..len)
            .map(|i| {
                let profile = Profile::new(name(&format!("p{i}")));
                if i + 1 < len {
                    profile.with_parent(name(&format!("p{}", i + 1)))
                } else {
                    profile
                }
            })
            .collect()
    }

    #[test]
    fn test_chain_at_max_depth_resolves() -> Result<(), ProfileError> {
        let source = linear_chain(MAX_INHERITANCE_DEPTH);
        let resolved = resolve(&source, &name("p0"))?;
        assert_eq!(resolved.inheritance_chain.len(), MAX_INHERITANCE_DEPTH);
        Ok(())
    }

    #[test]
    fn test_chain_too_deep() {
        let source = linear_chain(MAX_INHERITANCE_DEPTH + 1);
        let err = resolve(&source, &name("p0"));
        assert!(matches!(
            err,
            Err(ProfileError::ChainTooDeep { depth, max_depth })
                if depth == MAX_INHERITANCE_DEPTH + 1 && max_depth == MAX_INHERITANCE_DEPTH
        ));
    }

    #[test]
    fn test_custom_max_depth() {
        let source = linear_chain(3);
        let err = Resolver::new(&source).with_max_depth(2).resolve(&name("p0"));
        assert!(matches!(err, Err(ProfileError::ChainTooDeep { max_depth: 2, .. })));
    }

    #[test]
    fn test_overlay_replaces_stored_record() -> Result<(), ProfileError> {
        let source: InMemoryProfileSource = [
            Profile::new(name("base")).with_email("old@x.com"),
            child("work", "base"),
        ]
        .into_iter()
        .collect();
        let candidate = Profile::new(name("base")).with_email("new@x.com");

        let resolved = Resolver::new(&source)
            .with_overlay(&candidate)
            .resolve(&name("work"))?;
        assert_eq!(resolved.identity.email.as_deref(), Some("new@x.com"));
        Ok(())
    }

    #[test]
    fn test_overlay_can_introduce_cycle() {
        let source: InMemoryProfileSource = [child("work", "base"), Profile::new(name("base"))]
            .into_iter()
            .collect();
        let candidate = child("base", "work");
        let err = Resolver::new(&source)
            .with_overlay(&candidate)
            .resolve(&name("base"));
        assert!(matches!(&err, Err(e) if e.code() == ErrorCode::CircularInheritance));
    }

    #[test]
    fn test_extension_provenance_and_override() -> Result<(), ProfileError> {
        let source: InMemoryProfileSource = [
            Profile::new(name("base"))
                .with_extension("core.editor", "vim")
                .with_extension("pull.rebase", true),
            child("work", "base").with_extension("core.editor", "nano"),
        ]
        .into_iter()
        .collect();
        let resolved = resolve(&source, &name("work"))?;
        assert_eq!(
            resolved.extensions.get("core.editor"),
            Some(&ScalarValue::from("nano"))
        );
        assert_eq!(
            resolved.provenance.source_of("extensions.pull.rebase"),
            Some(&name("base"))
        );
        assert_eq!(
            resolved.provenance.source_of("extensions.core.editor"),
            Some(&name("work"))
        );
        Ok(())
    }
}

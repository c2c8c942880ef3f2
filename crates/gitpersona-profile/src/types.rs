//! Profile data types.

use core::fmt;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::str::FromStr;

use gitpersona_errors::ProfileError;
use serde::{Deserialize, Serialize};

/// Maximum length of a profile name in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Names that collide with store bookkeeping.
pub const RESERVED_NAMES: &[&str] = &["backups", "locks"];

/// A validated profile name.
///
/// Names are 1 to 64 bytes of `[A-Za-z0-9._-]`, do not start with `.` or
/// `-`, do not contain `..` and are not reserved. A `ProfileName` is
/// therefore always safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileName(String);

impl ProfileName {
    /// Validate and wrap a name.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::InvalidName`] describing the first rule broken.
    pub fn new(name: impl Into<String>) -> Result<Self, ProfileError> {
        let name = name.into();
        if let Some(reason) = name_violation(&name) {
            return Err(ProfileError::invalid_name(name, reason));
        }
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

fn name_violation(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("name must not be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Some(format!(
            "name is {} bytes (max: {MAX_NAME_LEN})",
            name.len()
        ));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Some("name must not start with '.' or '-'".to_string());
    }
    if name.contains("..") {
        return Some("name must not contain '..'".to_string());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Some(format!("character {bad:?} is not allowed"));
    }
    if RESERVED_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
    {
        return Some("name is reserved".to_string());
    }
    None
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProfileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProfileName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProfileName {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProfileName {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ProfileName {
    type Error = ProfileError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProfileName> for String {
    fn from(value: ProfileName) -> Self {
        value.0
    }
}

/// Author identity fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Identity {
    /// Display name (`user.name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact address (`user.email`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Whether neither field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// Commit signing method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningMethod {
    /// SSH key signing
    Ssh,
    /// OpenPGP signing
    Gpg,
    /// X.509 certificate signing
    X509,
    /// Keyless (Sigstore) signing
    Keyless,
}

impl SigningMethod {
    /// Lowercase identifier as stored in records.
    pub fn as_str(self) -> &'static str {
        match self {
            SigningMethod::Ssh => "ssh",
            SigningMethod::Gpg => "gpg",
            SigningMethod::X509 => "x509",
            SigningMethod::Keyless => "keyless",
        }
    }

    /// Whether this method needs a key reference.
    pub fn requires_key(self) -> bool {
        !matches!(self, SigningMethod::Keyless)
    }
}

impl fmt::Display for SigningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signing settings. Every field is optional so that a child profile can
/// override a single field of its parent's group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    /// Signing method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<SigningMethod>,
    /// Opaque key reference (a path, fingerprint or secret-manager reference)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Sign commits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_commits: Option<bool>,
    /// Sign tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_tags: Option<bool>,
}

impl SigningConfig {
    /// Signing group with only a method set.
    pub fn with_method(method: SigningMethod) -> Self {
        Self {
            method: Some(method),
            ..Self::default()
        }
    }

    /// Set the key reference.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set whether commits are signed.
    pub fn sign_commits(mut self, sign: bool) -> Self {
        self.sign_commits = Some(sign);
        self
    }

    /// Set whether tags are signed.
    pub fn sign_tags(mut self, sign: bool) -> Self {
        self.sign_tags = Some(sign);
        self
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.method.is_none()
            && self.key.is_none()
            && self.sign_commits.is_none()
            && self.sign_tags.is_none()
    }
}

/// Scalar extension value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// String
    String(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Integer(i) => write!(f, "{i}"),
            ScalarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

/// A named, persisted configuration profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Unique name, immutable after creation
    pub name: ProfileName,
    /// Profile this one extends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ProfileName>,
    /// Author identity
    #[serde(default, skip_serializing_if = "Identity::is_empty")]
    pub identity: Identity,
    /// Signing settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing: Option<SigningConfig>,
    /// Additional configuration keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, ScalarValue>,
}

impl Profile {
    /// Create an empty profile.
    pub fn new(name: ProfileName) -> Self {
        Self {
            name,
            parent: None,
            identity: Identity::default(),
            signing: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Set the parent profile.
    pub fn with_parent(mut self, parent: ProfileName) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the identity display name.
    pub fn with_identity_name(mut self, name: impl Into<String>) -> Self {
        self.identity.name = Some(name.into());
        self
    }

    /// Set the identity address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.identity.email = Some(email.into());
        self
    }

    /// Set the signing group.
    pub fn with_signing(mut self, signing: SigningConfig) -> Self {
        self.signing = Some(signing);
        self
    }

    /// Add an extension key.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }
}

/// Listing entry for a stored profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    /// Profile name
    pub name: ProfileName,
    /// Parent, if any
    pub parent: Option<ProfileName>,
    /// Identity address set directly on this profile
    pub email: Option<String>,
    /// Signing method set directly on this profile
    pub signing_method: Option<SigningMethod>,
    /// Number of extension keys
    pub extension_count: usize,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            parent: profile.parent.clone(),
            email: profile.identity.email.clone(),
            signing_method: profile.signing.as_ref().and_then(|s| s.method),
            extension_count: profile.extensions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitpersona_errors::{Classify, ErrorCode};

    #[test]
    fn test_valid_names() {
        for name in ["work", "base-2", "Client_A", "a.b", "x"] {
            assert!(ProfileName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        for name in [
            "",
            long.as_str(),
            ".hidden",
            "-flag",
            "a..b",
            "../etc",
            "a/b",
            "a\\b",
            "sp ace",
            "nul\0",
            "backups",
            "LOCKS",
        ] {
            let err = ProfileName::new(name);
            assert!(
                matches!(&err, Err(e) if e.code() == ErrorCode::InvalidName),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_max_length_name_is_valid() {
        assert!(ProfileName::new("a".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_name_deserialize_rejects_traversal() {
        let result: Result<ProfileName, _> = serde_json::from_str("\"../x\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(ScalarValue::Bool(true).to_string(), "true");
        assert_eq!(ScalarValue::Integer(-3).to_string(), "-3");
        assert_eq!(ScalarValue::from("vim").to_string(), "vim");
    }

    #[test]
    fn test_signing_is_empty() {
        assert!(SigningConfig::default().is_empty());
        assert!(!SigningConfig::with_method(SigningMethod::Ssh).is_empty());
        assert!(!SigningConfig::default().sign_tags(false).is_empty());
    }
}

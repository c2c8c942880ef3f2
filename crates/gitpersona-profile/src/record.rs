//! Persisted record format and schema migration.
//!
//! A record is the pretty-printed JSON form of a [`Profile`] with a leading
//! `schema_version`. Unknown top-level scalar keys are folded into
//! `extensions` so that hand-edited or future-written records keep their
//! settings instead of being rejected.

use std::path::Path;

use gitpersona_errors::StoreError;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{Profile, ScalarValue};

/// Current record schema version.
/// Increment this when the record layout changes incompatibly.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "schema_version";

const KNOWN_KEYS: &[&str] = &["name", "parent", "identity", "signing", "extensions"];

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// The profile
    pub profile: Profile,
    /// Schema version found on disk (0 when absent)
    pub stored_version: u32,
    /// Whether the record was migrated to [`CURRENT_SCHEMA_VERSION`]
    pub migrated: bool,
    /// Unknown top-level keys moved into `extensions`
    pub folded_keys: Vec<String>,
}

#[derive(Serialize)]
struct RecordOut<'a> {
    schema_version: u32,
    #[serde(flatten)]
    profile: &'a Profile,
}

/// Encode a profile as a record.
///
/// # Errors
///
/// Returns [`StoreError::InvalidFormat`] if serialization fails.
pub fn encode(profile: &Profile, path: &Path) -> Result<Vec<u8>, StoreError> {
    let mut bytes = serde_json::to_vec_pretty(&RecordOut {
        schema_version: CURRENT_SCHEMA_VERSION,
        profile,
    })
    .map_err(|e| StoreError::invalid_format(path, e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode a record, migrating older schemas and folding unknown keys.
///
/// # Errors
///
/// - [`StoreError::InvalidFormat`] for malformed JSON, a non-object document,
///   a non-scalar unknown key or any field of the wrong type
/// - [`StoreError::UnsupportedSchemaVersion`] for records newer than this build
pub fn decode(bytes: &[u8], path: &Path) -> Result<DecodedRecord, StoreError> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| StoreError::invalid_format(path, e.to_string()))?;
    let Value::Object(mut map) = document else {
        return Err(StoreError::invalid_format(
            path,
            "record must be a JSON object",
        ));
    };

    let stored_version = schema_version(&mut map, path)?;
    let migrated = migrate(stored_version, path)?;

    let unknown: Vec<String> = map
        .keys()
        .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    let mut folded = Vec::with_capacity(unknown.len());
    for key in unknown {
        if let Some(value) = map.remove(&key) {
            folded.push((key, scalar(value, path)?));
        }
    }

    let mut profile: Profile = serde_json::from_value(Value::Object(map))
        .map_err(|e| StoreError::invalid_format(path, e.to_string()))?;

    let mut folded_keys = Vec::with_capacity(folded.len());
    for (key, value) in folded {
        if profile.extensions.contains_key(&key) {
            warn!(profile = %profile.name, key = %key, "unknown key shadowed by explicit extension");
            continue;
        }
        debug!(profile = %profile.name, key = %key, "folding unknown record key into extensions");
        profile.extensions.insert(key.clone(), value);
        folded_keys.push(key);
    }

    Ok(DecodedRecord {
        profile,
        stored_version,
        migrated,
        folded_keys,
    })
}

fn schema_version(map: &mut Map<String, Value>, path: &Path) -> Result<u32, StoreError> {
    match map.remove(SCHEMA_VERSION_KEY) {
        None => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| StoreError::invalid_format(path, format!("invalid schema_version {n}"))),
        Some(other) => Err(StoreError::invalid_format(
            path,
            format!("schema_version must be an integer, found {other}"),
        )),
    }
}

/// Bring a record at `version` up to [`CURRENT_SCHEMA_VERSION`].
///
/// Returns whether a migration was performed.
fn migrate(version: u32, path: &Path) -> Result<bool, StoreError> {
    if version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchemaVersion {
            path: path.to_path_buf(),
            found: version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    if version == CURRENT_SCHEMA_VERSION {
        return Ok(false);
    }
    // v0 -> v1: unversioned records share the v1 layout.
    debug!(path = %path.display(), from = version, to = CURRENT_SCHEMA_VERSION, "migrating record");
    Ok(true)
}

fn scalar(value: Value, path: &Path) -> Result<ScalarValue, StoreError> {
    match value {
        Value::Bool(b) => Ok(ScalarValue::Bool(b)),
        Value::String(s) => Ok(ScalarValue::String(s)),
        Value::Number(n) => n.as_i64().map(ScalarValue::Integer).ok_or_else(|| {
            StoreError::invalid_format(path, format!("unknown key holds non-integer number {n}"))
        }),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(StoreError::invalid_format(
            path,
            "unknown keys must hold scalar values",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProfileName, SigningConfig, SigningMethod};
    use gitpersona_errors::{Classify, ErrorCode};

    fn path() -> &'static Path {
        Path::new("/profiles/work.json")
    }

    fn name(s: &str) -> ProfileName {
        match ProfileName::new(s) {
            Ok(n) => n,
            Err(e) => panic!("bad test name: {e}"),
        }
    }

    #[test]
    fn test_encode_layout() -> Result<(), StoreError> {
        let profile = Profile::new(name("work"))
            .with_parent(name("base"))
            .with_identity_name("W")
            .with_signing(
                SigningConfig::with_method(SigningMethod::Ssh)
                    .key("~/.ssh/id_work.pub")
                    .sign_commits(true),
            )
            .with_extension("core.editor", "vim");
        let bytes = encode(&profile, path())?;
        let text = String::from_utf8_lossy(&bytes).trim_end().to_string();
        insta::assert_snapshot!(text, @r#"
        {
          "schema_version": 1,
          "name": "work",
          "parent": "base",
          "identity": {
            "name": "W"
          },
          "signing": {
            "method": "ssh",
            "key": "~/.ssh/id_work.pub",
            "sign_commits": true
          },
          "extensions": {
            "core.editor": "vim"
          }
        }
        "#);
        Ok(())
    }

    #[test]
    fn test_decode_round_trip() -> Result<(), StoreError> {
        let profile = Profile::new(name("work")).with_email("w@example.com");
        let decoded = decode(&encode(&profile, path())?, path())?;
        assert_eq!(decoded.profile, profile);
        assert!(!decoded.migrated);
        assert!(decoded.folded_keys.is_empty());
        Ok(())
    }

    #[test]
    fn test_unversioned_record_is_migrated() -> Result<(), StoreError> {
        let decoded = decode(br#"{"name": "old"}"#, path())?;
        assert_eq!(decoded.stored_version, 0);
        assert!(decoded.migrated);
        Ok(())
    }

    #[test]
    fn test_future_version_rejected() {
        let err = decode(br#"{"schema_version": 2, "name": "new"}"#, path());
        assert!(matches!(
            err,
            Err(StoreError::UnsupportedSchemaVersion { found: 2, supported: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_scalar_keys_fold_into_extensions() -> Result<(), StoreError> {
        let decoded = decode(
            br#"{"schema_version": 1, "name": "w", "pull.rebase": true, "extensions": {"core.editor": "vim"}}"#,
            path(),
        )?;
        assert_eq!(decoded.folded_keys, vec!["pull.rebase".to_string()]);
        assert_eq!(
            decoded.profile.extensions.get("pull.rebase"),
            Some(&ScalarValue::Bool(true))
        );
        assert_eq!(decoded.profile.extensions.len(), 2);
        Ok(())
    }

    #[test]
    fn test_explicit_extension_wins_over_folded_key() -> Result<(), StoreError> {
        let decoded = decode(
            br#"{"name": "w", "core.editor": "nano", "extensions": {"core.editor": "vim"}}"#,
            path(),
        )?;
        assert!(decoded.folded_keys.is_empty());
        assert_eq!(
            decoded.profile.extensions.get("core.editor"),
            Some(&ScalarValue::from("vim"))
        );
        Ok(())
    }

    #[test]
    fn test_non_scalar_unknown_key_is_invalid() {
        let err = decode(br#"{"name": "w", "hooks": ["a"]}"#, path());
        assert!(matches!(&err, Err(e) if e.code() == ErrorCode::InvalidFormat));
    }

    #[test]
    fn test_truncated_record_is_invalid() {
        let err = decode(br#"{"name": "w", "ident"#, path());
        assert!(matches!(&err, Err(e) if e.code() == ErrorCode::InvalidFormat));
    }

    #[test]
    fn test_invalid_name_in_record_is_invalid_format() {
        let err = decode(br#"{"name": "../escape"}"#, path());
        assert!(matches!(&err, Err(e) if e.code() == ErrorCode::InvalidFormat));
    }
}

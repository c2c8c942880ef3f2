//! The profile store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use gitpersona_errors::StoreError;
use gitpersona_profile::record::{self, DecodedRecord};
use gitpersona_profile::{Profile, ProfileName, ProfileSource, ProfileSummary};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::locks::{DEFAULT_LOCK_TIMEOUT, LockRegistry};
use crate::storage::{self, AtomicWrite, StageHook};

/// Extension of live records.
pub const RECORD_EXTENSION: &str = "json";

/// Suffix of backup files.
pub const BACKUP_SUFFIX: &str = ".json.bak";

/// Backup directory under the store root.
pub const BACKUP_DIR: &str = "backups";

/// Lock directory under the store root.
pub const LOCK_DIR: &str = ".locks";

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one record per profile
    pub root: PathBuf,
    /// How long to wait for another process's lock on a record
    pub lock_timeout: Duration,
}

impl StoreConfig {
    /// Create a configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set the cross-process lock timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Path of the live record
    pub path: PathBuf,
    /// Backup of the replaced version, if one existed
    pub backup: Option<PathBuf>,
    /// Whether the record did not exist before
    pub created: bool,
}

/// A backup of a profile record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    /// Profile the backup belongs to
    pub name: ProfileName,
    /// Backup file
    pub path: PathBuf,
    /// When the backup was taken
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Create,
    Replace,
    Upsert,
}

/// Durable, owner-only store of profile records.
///
/// Layout under the root:
///
/// - `<name>.json`: live record
/// - `backups/<name>_<UTC timestamp>.json.bak`: previous versions, never deleted by the store
/// - `.locks/<name>.lock`: advisory lock files
/// - `.<name>.<uuid>.tmp`: in-flight writes
pub struct ProfileStore {
    root: PathBuf,
    locks: LockRegistry,
    hook: Option<StageHook>,
}

impl ProfileStore {
    /// Open (creating if needed) the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store directories cannot be created.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        storage::ensure_private_dir(&config.root)?;
        storage::ensure_private_dir(&config.root.join(BACKUP_DIR))?;
        storage::ensure_private_dir(&config.root.join(LOCK_DIR))?;
        info!(root = %config.root.display(), "opened profile store");
        Ok(Self {
            locks: LockRegistry::new(config.root.join(LOCK_DIR), config.lock_timeout),
            root: config.root,
            hook: None,
        })
    }

    /// Install a callback run after each write stage.
    pub fn with_stage_hook(mut self, hook: StageHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the live record for `name`.
    pub fn record_path(&self, name: &ProfileName) -> PathBuf {
        self.root.join(format!("{name}.{RECORD_EXTENSION}"))
    }

    fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    fn temp_path(&self, name: &ProfileName) -> PathBuf {
        self.root.join(format!(".{name}.{}.tmp", Uuid::new_v4()))
    }

    /// Read the record for `name`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if there is no record
    /// - [`StoreError::InvalidFormat`] / [`StoreError::UnsupportedSchemaVersion`]
    ///   if the record cannot be decoded
    /// - [`StoreError::Io`] / [`StoreError::PermissionDenied`] on filesystem failure
    pub fn read(&self, name: &ProfileName) -> Result<Profile, StoreError> {
        Ok(self.read_record(name)?.profile)
    }

    /// Read and decode the record for `name`, with migration details.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    pub fn read_record(&self, name: &ProfileName) -> Result<DecodedRecord, StoreError> {
        let path = self.record_path(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(name.as_str()));
            }
            Err(e) => return Err(StoreError::io("read", &path, e)),
        };

        match fs::metadata(&path) {
            Ok(metadata) => {
                if let Some(mode) = storage::excess_permissions(&metadata) {
                    warn!(
                        profile = %name,
                        path = %path.display(),
                        mode = format_args!("{mode:o}"),
                        "profile record is readable by other users"
                    );
                }
            }
            Err(e) => debug!(path = %path.display(), error = %e, "could not stat record"),
        }

        let decoded = record::decode(&bytes, &path)?;
        if &decoded.profile.name != name {
            return Err(StoreError::invalid_format(
                &path,
                format!(
                    "record names profile '{}' but is stored as '{name}'",
                    decoded.profile.name
                ),
            ));
        }
        if decoded.migrated {
            info!(profile = %name, from = decoded.stored_version, "read record from older schema");
        }
        Ok(decoded)
    }

    /// Whether a record exists for `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if existence cannot be determined.
    pub fn exists(&self, name: &ProfileName) -> Result<bool, StoreError> {
        let path = self.record_path(name);
        path.try_exists()
            .map_err(|e| StoreError::io("stat", &path, e))
    }

    /// Create or replace the record for `profile.name`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails; the previous record (if
    /// any) is untouched unless the failure happened after the rename.
    pub fn write(&self, profile: &Profile) -> Result<WriteOutcome, StoreError> {
        self.write_with(profile, WriteMode::Upsert)
    }

    /// Create a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if a record with that name exists.
    pub fn create(&self, profile: &Profile) -> Result<WriteOutcome, StoreError> {
        self.write_with(profile, WriteMode::Create)
    }

    /// Replace an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no record to replace.
    pub fn replace(&self, profile: &Profile) -> Result<WriteOutcome, StoreError> {
        self.write_with(profile, WriteMode::Replace)
    }

    fn write_with(&self, profile: &Profile, mode: WriteMode) -> Result<WriteOutcome, StoreError> {
        let name = &profile.name;
        let _lock = self.locks.lock(name.as_str())?;
        let target = self.record_path(name);

        let existed = self.exists(name)?;
        match mode {
            WriteMode::Create if existed => {
                return Err(StoreError::AlreadyExists {
                    name: name.as_str().to_string(),
                });
            }
            WriteMode::Replace if !existed => return Err(StoreError::not_found(name.as_str())),
            _ => {}
        }

        let bytes = record::encode(profile, &target)?;
        let write = AtomicWrite {
            target: &target,
            temp: self.temp_path(name),
            hook: self.hook.as_ref(),
        };
        let backup = write.run(&bytes, || {
            if existed {
                self.backup_live(name, &target).map(|(path, _)| Some(path))
            } else {
                Ok(None)
            }
        })?;

        info!(profile = %name, created = !existed, "wrote profile record");
        Ok(WriteOutcome {
            path: target,
            backup,
            created: !existed,
        })
    }

    /// Copy the live record to a fresh backup, returning its path and the
    /// SHA-256 of the bytes copied.
    fn backup_live(&self, name: &ProfileName, live: &Path) -> Result<(PathBuf, [u8; 32]), StoreError> {
        let bytes = fs::read(live).map_err(|e| StoreError::io("read for backup", live, e))?;
        let dir = self.backup_dir();
        storage::ensure_private_dir(&dir)?;

        let stamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut attempt = 0u32;
        let path = loop {
            let file_name = if attempt == 0 {
                format!("{name}_{stamp}{BACKUP_SUFFIX}")
            } else {
                format!("{name}_{stamp}-{attempt}{BACKUP_SUFFIX}")
            };
            let candidate = dir.join(file_name);
            match storage::write_new_durable(&candidate, &bytes) {
                Ok(()) => break candidate,
                Err(StoreError::Io { source, .. })
                    if source.kind() == io::ErrorKind::AlreadyExists && attempt < 1000 =>
                {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };
        storage::fsync_dir(&dir)?;
        debug!(profile = %name, backup = %path.display(), "backup created");
        Ok((path, Sha256::digest(&bytes).into()))
    }

    /// Delete the record for `name`, returning the path of the backup taken
    /// first. The backup is confirmed by digest before the record is removed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if there is no record
    /// - [`StoreError::BackupUnconfirmed`] if the backup does not match the live bytes
    pub fn delete(&self, name: &ProfileName) -> Result<PathBuf, StoreError> {
        let _lock = self.locks.lock(name.as_str())?;
        let live = self.record_path(name);
        if !self.exists(name)? {
            return Err(StoreError::not_found(name.as_str()));
        }

        let (backup, digest) = self.backup_live(name, &live)?;
        let confirmed = fs::read(&backup)
            .map(|bytes| <[u8; 32]>::from(Sha256::digest(&bytes)) == digest)
            .unwrap_or(false);
        if !confirmed {
            return Err(StoreError::BackupUnconfirmed {
                name: name.as_str().to_string(),
                path: backup,
            });
        }

        fs::remove_file(&live).map_err(|e| StoreError::io("remove", &live, e))?;
        storage::fsync_dir(&self.root)?;
        info!(profile = %name, backup = %backup.display(), "deleted profile record");
        Ok(backup)
    }

    /// Summaries of every readable record, sorted by name.
    ///
    /// Dot-files, backups and non-record files are skipped; unreadable
    /// records are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store directory cannot be listed.
    pub fn list(&self) -> Result<Vec<ProfileSummary>, StoreError> {
        let mut summaries: Vec<ProfileSummary> = self
            .list_profiles()?
            .iter()
            .map(ProfileSummary::from)
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| StoreError::io("list", &self.root, e))?;
        let mut profiles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("list", &self.root, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }
            let Some(stem) = file_name.strip_suffix(".json") else {
                continue;
            };
            if entry.file_type().map(|t| !t.is_file()).unwrap_or(true) {
                continue;
            }
            let name = match ProfileName::new(stem) {
                Ok(name) => name,
                Err(e) => {
                    warn!(file = file_name, error = %e, "skipping record with invalid name");
                    continue;
                }
            };
            match self.read(&name) {
                Ok(profile) => profiles.push(profile),
                Err(e) => warn!(profile = %name, error = %e, "skipping unreadable record"),
            }
        }
        Ok(profiles)
    }

    /// Names of profiles whose `parent` is `name`, sorted.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store directory cannot be listed.
    pub fn children_of(&self, name: &ProfileName) -> Result<Vec<ProfileName>, StoreError> {
        let mut children: Vec<ProfileName> = self
            .list_profiles()?
            .into_iter()
            .filter(|p| p.parent.as_ref() == Some(name))
            .map(|p| p.name)
            .collect();
        children.sort();
        Ok(children)
    }

    /// Backups of `name`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backup directory cannot be listed.
    pub fn backups(&self, name: &ProfileName) -> Result<Vec<BackupEntry>, StoreError> {
        let dir = self.backup_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("list backups", &dir, e)),
        };
        let prefix = format!("{name}_");
        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("list backups", &dir, e))?;
            let file_name = entry.file_name();
            let Some(created_at) = file_name
                .to_str()
                .and_then(|f| f.strip_prefix(prefix.as_str()))
                .and_then(|rest| rest.strip_suffix(BACKUP_SUFFIX))
                .and_then(parse_backup_stamp)
            else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            backups.push(BackupEntry {
                name: name.clone(),
                path: entry.path(),
                created_at,
                size,
            });
        }
        backups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));
        Ok(backups)
    }

    /// Restore `name` from one of its backups. The current record, if any,
    /// is itself backed up first.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if `backup` is not a backup of `name`
    /// - [`StoreError::InvalidFormat`] if the backup does not decode to `name`
    pub fn restore(&self, name: &ProfileName, backup: &Path) -> Result<WriteOutcome, StoreError> {
        let known = self.backups(name)?.into_iter().any(|b| b.path == backup);
        if !known {
            return Err(StoreError::NotFound {
                name: backup.display().to_string(),
            });
        }
        let bytes = fs::read(backup).map_err(|e| StoreError::io("read backup", backup, e))?;
        let decoded = record::decode(&bytes, backup)?;
        if &decoded.profile.name != name {
            return Err(StoreError::invalid_format(
                backup,
                format!("backup holds profile '{}'", decoded.profile.name),
            ));
        }
        let outcome = self.write(&decoded.profile)?;
        info!(profile = %name, backup = %backup.display(), "restored profile from backup");
        Ok(outcome)
    }
}

fn parse_backup_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    // A `-N` suffix disambiguates backups taken within the same microsecond.
    let base = match stamp.rsplit_once('-') {
        Some((base, counter)) if counter.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => stamp,
    };
    NaiveDateTime::parse_from_str(base, BACKUP_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

impl ProfileSource for ProfileStore {
    fn load(&self, name: &ProfileName) -> Result<Option<Profile>, StoreError> {
        match self.read(name) {
            Ok(profile) => Ok(Some(profile)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl core::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("root", &self.root)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

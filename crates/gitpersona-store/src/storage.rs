//! Low-level file operations: atomic replace, owner-only permissions and
//! directory syncs.

use core::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gitpersona_errors::StoreError;
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// Mode of record, backup and temp files.
pub const FILE_MODE: u32 = 0o600;

/// Mode of store directories.
pub const DIR_MODE: u32 = 0o700;

/// Steps of an atomic write, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStage {
    /// Record bytes produced
    Serialized,
    /// Owner-only temp file created next to the target
    TempCreated,
    /// Bytes written to the temp file
    TempWritten,
    /// Temp file flushed to durable storage
    TempSynced,
    /// Previous version copied to the backup directory (skipped for new records)
    BackupTaken,
    /// Temp file renamed over the target
    Renamed,
    /// Directory entry flushed
    DirSynced,
}

impl WriteStage {
    /// All stages in execution order.
    pub const ALL: [WriteStage; 7] = [
        WriteStage::Serialized,
        WriteStage::TempCreated,
        WriteStage::TempWritten,
        WriteStage::TempSynced,
        WriteStage::BackupTaken,
        WriteStage::Renamed,
        WriteStage::DirSynced,
    ];

    /// Stage name used as the failing operation in errors.
    pub fn as_str(self) -> &'static str {
        match self {
            WriteStage::Serialized => "serialize",
            WriteStage::TempCreated => "create temp file",
            WriteStage::TempWritten => "write temp file",
            WriteStage::TempSynced => "sync temp file",
            WriteStage::BackupTaken => "backup",
            WriteStage::Renamed => "rename",
            WriteStage::DirSynced => "sync directory",
        }
    }

    /// Whether the new record is visible once this stage has completed.
    pub fn is_committed(self) -> bool {
        matches!(self, WriteStage::Renamed | WriteStage::DirSynced)
    }
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback run after each [`WriteStage`]; an error aborts the write there.
///
/// Used to inject faults in tests and to trace slow writes.
pub type StageHook = Arc<dyn Fn(WriteStage) -> io::Result<()> + Send + Sync>;

/// Removes the temp file unless the rename consumed it.
struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl TempGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = fs::remove_file(&self.path) {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %err, "failed to remove temp file");
                }
            }
        }
    }
}

/// Atomic replace of `target` with `bytes`.
pub(crate) struct AtomicWrite<'a> {
    pub target: &'a Path,
    pub temp: PathBuf,
    pub hook: Option<&'a StageHook>,
}

impl AtomicWrite<'_> {
    pub(crate) fn stage(&self, stage: WriteStage) -> Result<(), StoreError> {
        match self.hook {
            Some(hook) => hook(stage).map_err(|e| StoreError::io(stage.as_str(), self.target, e)),
            None => Ok(()),
        }
    }

    /// Run the write. `before_rename` runs after the temp file is durable and
    /// before it becomes visible; it is where the previous version is backed up.
    pub(crate) fn run<B>(self, bytes: &[u8], before_rename: B) -> Result<Option<PathBuf>, StoreError>
    where
        B: FnOnce() -> Result<Option<PathBuf>, StoreError>,
    {
        self.stage(WriteStage::Serialized)?;

        let mut guard = TempGuard::new(self.temp.clone());
        let mut file = create_owner_only(&self.temp)?;
        self.stage(WriteStage::TempCreated)?;

        file.write_all(bytes)
            .map_err(|e| StoreError::io("write temp file", &self.temp, e))?;
        self.stage(WriteStage::TempWritten)?;

        file.sync_all()
            .map_err(|e| StoreError::io("sync temp file", &self.temp, e))?;
        drop(file);
        self.stage(WriteStage::TempSynced)?;

        let backup = before_rename()?;
        self.stage(WriteStage::BackupTaken)?;

        fs::rename(&self.temp, self.target)
            .map_err(|e| StoreError::io("rename", self.target, e))?;
        guard.disarm();
        debug!(path = %self.target.display(), "record renamed into place");
        self.stage(WriteStage::Renamed)?;

        if let Some(dir) = self.target.parent() {
            fsync_dir(dir)?;
        }
        self.stage(WriteStage::DirSynced)?;

        restrict_permissions(self.target)?;
        Ok(backup)
    }
}

/// Create `path` exclusively with owner-only permissions.
pub(crate) fn create_owner_only(path: &Path) -> Result<File, StoreError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);
    options
        .open(path)
        .map_err(|e| StoreError::io("create file", path, e))
}

/// Write `bytes` to a new owner-only file and flush it.
pub(crate) fn write_new_durable(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = create_owner_only(path)?;
    file.write_all(bytes)
        .map_err(|e| StoreError::io("write file", path, e))?;
    file.sync_all()
        .map_err(|e| StoreError::io("sync file", path, e))?;
    Ok(())
}

/// Flush a directory entry table.
#[cfg(unix)]
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), StoreError> {
    let file = File::open(dir).map_err(|e| StoreError::io("open directory", dir, e))?;
    file.sync_all()
        .map_err(|e| StoreError::io("sync directory", dir, e))
}

#[cfg(not(unix))]
pub(crate) fn fsync_dir(_dir: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Set owner-only permissions on `path`.
#[cfg(unix)]
pub(crate) fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE))
        .map_err(|e| StoreError::io("set permissions", path, e))
}

#[cfg(not(unix))]
pub(crate) fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Create a store directory with owner-only permissions.
pub(crate) fn ensure_private_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|e| StoreError::io("create directory", dir, e))?;
    #[cfg(unix)]
    fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE))
        .map_err(|e| StoreError::io("set permissions", dir, e))?;
    Ok(())
}

/// Permission bits granted beyond the owner, if any.
#[cfg(unix)]
pub(crate) fn excess_permissions(metadata: &fs::Metadata) -> Option<u32> {
    let mode = metadata.permissions().mode() & 0o777;
    (mode & 0o077 != 0).then_some(mode)
}

#[cfg(not(unix))]
pub(crate) fn excess_permissions(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write(
        target: &Path,
        temp: PathBuf,
        hook: Option<&StageHook>,
        bytes: &[u8],
    ) -> Result<Option<PathBuf>, StoreError> {
        AtomicWrite { target, temp, hook }.run(bytes, || Ok(None))
    }

    #[test]
    fn test_atomic_write_creates_target() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("a.json");
        write(&target, dir.path().join(".a.tmp"), None, b"{}")?;
        assert_eq!(fs::read(&target)?, b"{}");
        assert!(!dir.path().join(".a.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_every_stage_reaches_hook_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let hook: StageHook = {
            let seen = Arc::clone(&seen);
            Arc::new(move |stage| {
                seen.lock().push(stage);
                Ok(())
            })
        };
        write(&dir.path().join("a.json"), dir.path().join(".a.tmp"), Some(&hook), b"x")?;
        assert_eq!(seen.lock().as_slice(), WriteStage::ALL.as_slice());
        Ok(())
    }

    #[test]
    fn test_failure_before_rename_removes_temp_and_keeps_original()
    -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("a.json");
        fs::write(&target, b"old")?;
        let calls = Arc::new(AtomicUsize::new(0));
        let hook: StageHook = {
            let calls = Arc::clone(&calls);
            Arc::new(move |stage| {
                calls.fetch_add(1, Ordering::SeqCst);
                if stage == WriteStage::TempWritten {
                    Err(io::Error::other("injected"))
                } else {
                    Ok(())
                }
            })
        };
        let result = write(&target, dir.path().join(".a.tmp"), Some(&hook), b"new");
        assert!(result.is_err());
        assert_eq!(fs::read(&target)?, b"old");
        assert!(!dir.path().join(".a.tmp").exists());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_temp_and_target_are_owner_only() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("a.json");
        fs::write(&target, b"old")?;
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644))?;

        write(&target, dir.path().join(".a.tmp"), None, b"new")?;
        let mode = fs::metadata(&target)?.permissions().mode() & 0o777;
        assert_eq!(mode, FILE_MODE);
        Ok(())
    }

    #[test]
    fn test_create_owner_only_refuses_existing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("x");
        fs::write(&path, b"")?;
        assert!(create_owner_only(&path).is_err());
        Ok(())
    }
}

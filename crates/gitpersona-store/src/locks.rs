//! Per-key locking: an in-process mutex plus an advisory file lock.
//!
//! The mutex serializes threads of this process; the `fs4` lock on
//! `<dir>/<key>.lock` serializes processes. Different keys never share
//! either lock.

use core::fmt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fs4::FileExt;
use gitpersona_errors::StoreError;
use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};
use tracing::{debug, trace};

/// Default time to wait for another process's file lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// An exclusive advisory lock on a file, released on drop.
#[derive(Debug)]
pub struct FileLock {
    // Closing the descriptor releases the lock.
    _file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive lock on `path`, creating the file and its parent
    /// directory if needed, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockUnavailable`] when the lock is still held
    /// elsewhere after `timeout`, or the lock file cannot be opened.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io("create lock directory", parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| StoreError::LockUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    trace!(path = %path.display(), "file lock acquired");
                    return Ok(Self {
                        _file: file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    if started.elapsed() >= timeout {
                        return Err(StoreError::LockUnavailable {
                            path: path.to_path_buf(),
                            source: err,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    return Err(StoreError::LockUnavailable {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

type Slots = Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Guard for one key of a [`LockRegistry`].
///
/// Drops the file lock before the in-process mutex, then forgets the key's
/// mutex if no other thread is waiting on it.
pub struct KeyLock {
    key: String,
    file: Option<FileLock>,
    local: Option<ArcMutexGuard<RawMutex, ()>>,
    slots: Slots,
}

impl KeyLock {
    /// Path of the held lock file.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(FileLock::path)
    }
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        drop(self.file.take());
        drop(self.local.take());
        let mut slots = self.slots.lock();
        // The map's own reference is the last one once nobody holds or awaits the mutex.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

impl fmt::Debug for KeyLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyLock")
            .field("key", &self.key)
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}

/// Registry of per-key locks backed by lock files in one directory.
#[derive(Debug)]
pub struct LockRegistry {
    dir: PathBuf,
    timeout: Duration,
    slots: Slots,
}

impl LockRegistry {
    /// Create a registry keeping lock files under `dir`.
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lock file path for `key`.
    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.lock"))
    }

    /// Number of keys currently locked or awaited in this process.
    pub fn active_keys(&self) -> usize {
        self.slots.lock().len()
    }

    /// Lock `key`. `key` must be a single safe path component.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockUnavailable`] if another process holds the
    /// file lock for longer than the configured timeout.
    pub fn lock(&self, key: &str) -> Result<KeyLock, StoreError> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        let local = slot.lock_arc();
        drop(slot);
        // Built before the file lock so a timeout still releases the slot.
        let mut guard = KeyLock {
            key: key.to_string(),
            file: None,
            local: Some(local),
            slots: Arc::clone(&self.slots),
        };
        guard.file = Some(FileLock::acquire(&self.lock_path(key), self.timeout)?);
        debug!(key, "lock acquired");
        Ok(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_second_file_lock_times_out() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("x.lock");
        let _held = FileLock::acquire(&path, Duration::from_millis(10))?;

        let second = FileLock::acquire(&path, Duration::from_millis(30));
        assert!(matches!(second, Err(StoreError::LockUnavailable { .. })));
        Ok(())
    }

    #[test]
    fn test_lock_released_on_drop() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("x.lock");
        drop(FileLock::acquire(&path, Duration::from_millis(10))?);
        let again = FileLock::acquire(&path, Duration::from_millis(10))?;
        assert_eq!(again.path(), path.as_path());
        Ok(())
    }

    #[test]
    fn test_registry_serializes_same_key() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let registry = Arc::new(LockRegistry::new(dir.path(), DEFAULT_LOCK_TIMEOUT));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || -> Result<(), StoreError> {
                    let _guard = registry.lock("same")?;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => panic!("lock thread panicked"),
            }
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_released_keys_are_forgotten() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let registry = LockRegistry::new(dir.path(), Duration::from_millis(20));
        for key in ["a", "b", "c"] {
            let guard = registry.lock(key)?;
            assert_eq!(guard.path(), Some(registry.lock_path(key).as_path()));
            assert_eq!(registry.active_keys(), 1);
        }
        assert_eq!(registry.active_keys(), 0);
        Ok(())
    }

    #[test]
    fn test_key_kept_while_another_thread_waits() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let registry = Arc::new(LockRegistry::new(dir.path(), DEFAULT_LOCK_TIMEOUT));
        let first = registry.lock("k")?;
        let waiter = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.lock("k").map(|guard| guard.path().is_some()))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(registry.active_keys(), 1);
        drop(first);
        match waiter.join() {
            Ok(result) => assert!(result?),
            Err(_) => panic!("waiting thread panicked"),
        }
        assert_eq!(registry.active_keys(), 0);
        Ok(())
    }

    #[test]
    fn test_debug_shows_key_and_path() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let registry = LockRegistry::new(dir.path(), Duration::from_millis(20));
        let guard = registry.lock("scope-local")?;
        let rendered = format!("{guard:?}");
        assert!(rendered.starts_with("KeyLock { key: \"scope-local\", path: Some("));
        assert!(rendered.contains("scope-local.lock"));
        Ok(())
    }

    #[test]
    fn test_registry_different_keys_do_not_block() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let registry = LockRegistry::new(dir.path(), Duration::from_millis(20));
        let _a = registry.lock("a")?;
        let _b = registry.lock("b")?;
        Ok(())
    }
}

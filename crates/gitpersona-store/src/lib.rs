//! Crash-safe, owner-only profile record store.
//!
//! Every write goes to an owner-only temp file next to the target, is
//! flushed, and is renamed over the target; the rename is the only moment
//! the new record becomes visible. The previous version is copied to
//! `backups/` first. Writers of the same name are serialized by an
//! in-process mutex and an advisory file lock.
//!
//! # Example
//!
//! ```
//! use gitpersona_profile::{Profile, ProfileName};
//! use gitpersona_store::{ProfileStore, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let store = ProfileStore::open(StoreConfig::new(dir.path()))?;
//!
//! let work = Profile::new(ProfileName::new("work")?).with_email("me@work.example");
//! store.create(&work)?;
//! assert_eq!(store.read(&work.name)?, work);
//!
//! let backup = store.delete(&work.name)?;
//! assert!(backup.exists());
//! assert!(!store.exists(&work.name)?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod locks;
pub mod storage;
pub mod store;

pub use locks::{DEFAULT_LOCK_TIMEOUT, FileLock, KeyLock, LockRegistry};
pub use storage::{FILE_MODE, StageHook, WriteStage};
pub use store::{BackupEntry, ProfileStore, StoreConfig, WriteOutcome};

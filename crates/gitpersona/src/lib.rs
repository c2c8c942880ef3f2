//! Named git identity profiles: stored durably, resolved through
//! inheritance, validated, and switched transactionally.
//!
//! [`ProfileManager`] ties the layers together:
//!
//! | Layer | Crate |
//! |-------|-------|
//! | error taxonomy | [`errors`] |
//! | secret handling | [`sensitive`] |
//! | model and inheritance | [`profile`] |
//! | durable records | [`store`] |
//! | rules | [`validation`] |
//! | git configuration | [`apply`] |
//!
//! A switch resolves the profile, validates it, snapshots the affected git
//! keys, writes them in a fixed order, reads them back, and either commits
//! or restores every key it touched.
//!
//! # Example
//!
//! ```
//! use gitpersona::prelude::*;
//! use gitpersona::apply::MemoryBackend;
//! use gitpersona::profile::{Profile, ProfileName};
//!
//! let dir = tempfile::tempdir()?;
//! let git = MemoryBackend::new();
//! let manager = ProfileManager::with_backend(&ManagerConfig::new(dir.path()), git.clone())?;
//!
//! let base = Profile::new(ProfileName::new("base")?).with_email("a@x.com");
//! let work = Profile::new(ProfileName::new("work")?)
//!     .with_parent(ProfileName::new("base")?)
//!     .with_identity_name("W");
//! manager.create(&base)?;
//! manager.create(&work)?;
//!
//! let result = manager.switch(&ProfileName::new("work")?)?;
//! assert_eq!(result.changed_keys, ["user.name", "user.email"]);
//! assert_eq!(git.get(Scope::Local, "user.email")?.as_deref(), Some("a@x.com"));
//!
//! // Already active: nothing is written.
//! assert!(!manager.switch(&ProfileName::new("work")?)?.changed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod prelude;
pub mod result;

pub use config::{ApplyConfig, LOG_ENV, LoggingConfig, ManagerConfig, PROFILES_DIR_ENV};
pub use error::SwitchError;
pub use logging::init_tracing;
pub use manager::ProfileManager;
pub use result::{DeleteOutcome, SwitchResult};

pub use gitpersona_apply::{CancellationToken, Scope, SwitchState};

pub use gitpersona_apply as apply;
pub use gitpersona_errors as errors;
pub use gitpersona_profile as profile;
pub use gitpersona_sensitive as sensitive;
pub use gitpersona_store as store;
pub use gitpersona_validation as validation;

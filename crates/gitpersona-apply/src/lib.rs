//! Transactional application of resolved profiles to git configuration.
//!
//! Git configuration has three layered scopes and no way to change several
//! keys atomically. [`TransactionalApplier`] provides that on top of any
//! [`ConfigBackend`]:
//!
//! 1. snapshot every managed key in every scope;
//! 2. write the planned changes in a fixed order, recording each key's
//!    prior value before it is written;
//! 3. read every written key back;
//! 4. commit, or restore the recorded values in reverse order.
//!
//! An incomplete rollback is reported as [`ApplyError::RollbackFailed`]
//! and never retried.
//!
//! # Example
//!
//! ```
//! use gitpersona_apply::prelude::*;
//! use gitpersona_profile::{Profile, ProfileName, ResolvedProfile};
//!
//! let profile = ResolvedProfile::from_record(
//!     &Profile::new(ProfileName::new("work")?).with_email("w@example.com"),
//! );
//! let backend = MemoryBackend::new();
//! let applier = TransactionalApplier::new(backend.clone());
//!
//! let outcome = applier.apply(&profile, Scope::Local, &CancellationToken::new())?;
//! assert_eq!(outcome.changed_keys().collect::<Vec<_>>(), ["user.email"]);
//! assert_eq!(
//!     backend.get(Scope::Local, "user.email")?.as_deref(),
//!     Some("w@example.com")
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod backend;
pub mod cancel;
pub mod error;
pub mod git;
pub mod plan;
pub mod prelude;
pub mod scope;
pub mod snapshot;
pub mod transaction;

pub use backend::{ConfigBackend, MemoryBackend};
pub use cancel::CancellationToken;
pub use error::{ApplyError, RollbackReport};
pub use git::{GitCliBackend, GitConfigOp, config_args};
pub use plan::{
    ApplyPlan, ChangeOperation, KEYLESS_SIGNING_PROGRAM, PlannedChange, ShadowedKey,
    affected_keys, desired_values, signing_format,
};
pub use scope::{ParseScopeError, Scope};
pub use snapshot::ConfigSnapshot;
pub use transaction::{ApplyOutcome, SwitchState, TransactionalApplier};

//! Profile model, record schema and inheritance resolution.
//!
//! A [`Profile`] is a named record with an optional parent. Resolving a
//! profile walks its parent chain and merges it root to leaf, field by
//! field, into a [`ResolvedProfile`] that records which chain member
//! supplied each value.
//!
//! # Example
//!
//! ```
//! use gitpersona_profile::prelude::*;
//!
//! let base = ProfileName::new("base")?;
//! let work = ProfileName::new("work")?;
//! let source: InMemoryProfileSource = [
//!     Profile::new(base.clone()).with_email("a@x.com"),
//!     Profile::new(work.clone()).with_parent(base.clone()).with_identity_name("W"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let resolved = resolve(&source, &work)?;
//! assert_eq!(resolved.identity.email.as_deref(), Some("a@x.com"));
//! assert_eq!(resolved.provenance.source_of(fields::IDENTITY_EMAIL), Some(&base));
//! # Ok::<(), gitpersona_errors::ProfileError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod keys;
pub mod prelude;
pub mod record;
pub mod resolve;
pub mod types;

pub use record::{CURRENT_SCHEMA_VERSION, DecodedRecord};
pub use resolve::{
    InMemoryProfileSource, MAX_INHERITANCE_DEPTH, ProfileSource, Provenance, ResolvedProfile,
    Resolver, fields, resolve,
};
pub use types::{
    Identity, MAX_NAME_LEN, Profile, ProfileName, ProfileSummary, RESERVED_NAMES, ScalarValue,
    SigningConfig, SigningMethod,
};

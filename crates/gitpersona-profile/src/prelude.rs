//! Convenience re-exports.

pub use crate::record::CURRENT_SCHEMA_VERSION;
pub use crate::resolve::{
    InMemoryProfileSource, MAX_INHERITANCE_DEPTH, ProfileSource, Provenance, ResolvedProfile,
    Resolver, fields, resolve,
};
pub use crate::types::{
    Identity, Profile, ProfileName, ProfileSummary, ScalarValue, SigningConfig, SigningMethod,
};

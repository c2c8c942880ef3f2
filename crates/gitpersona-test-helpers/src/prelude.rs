//! Convenience re-exports.

pub use crate::fixtures::{base_profile, chain, name, signed_profile, work_profile};
pub use crate::mock::{BackendCall, CORRUPTED_VALUE, FaultyBackend, RecordingBackend};
pub use crate::must::{must, must_parse, must_some};

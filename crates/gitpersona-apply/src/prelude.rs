//! Convenience re-exports.

pub use crate::backend::{ConfigBackend, MemoryBackend};
pub use crate::cancel::CancellationToken;
pub use crate::error::{ApplyError, RollbackReport};
pub use crate::git::GitCliBackend;
pub use crate::plan::{ApplyPlan, ChangeOperation, PlannedChange, ShadowedKey};
pub use crate::scope::Scope;
pub use crate::snapshot::ConfigSnapshot;
pub use crate::transaction::{ApplyOutcome, SwitchState, TransactionalApplier};

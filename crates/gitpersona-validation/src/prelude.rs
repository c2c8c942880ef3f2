//! Convenience re-exports.

pub use crate::report::{RuleOutcome, Severity, ValidationReport, Violation};
pub use crate::rules::{
    ExtensionKeySafety, IdentityAddressFormat, NoEmbeddedSecrets, RequiredIdentityFields,
    SigningConsistency,
};
pub use crate::validator::{Rule, RuleError, Validator};

//! Built-in rules.

mod extensions;
mod identity;
mod secrets;
mod signing;

pub use extensions::ExtensionKeySafety;
pub use identity::{IdentityAddressFormat, RequiredIdentityFields};
pub use secrets::NoEmbeddedSecrets;
pub use signing::SigningConsistency;

use crate::validator::Rule;

/// The built-in rules in their default order.
pub fn builtin() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(IdentityAddressFormat),
        Box::new(RequiredIdentityFields),
        Box::new(NoEmbeddedSecrets),
        Box::new(SigningConsistency),
        Box::new(ExtensionKeySafety),
    ]
}

//! Validation pipeline for resolved gitpersona profiles.
//!
//! A [`Validator`] runs an ordered, configurable set of [`Rule`]s against a
//! [`ResolvedProfile`](gitpersona_profile::ResolvedProfile) and collects
//! every violation rather than stopping at the first. Blocking violations
//! prevent the profile from being applied; advisory ones are surfaced only.
//!
//! # Built-in rules
//!
//! | Rule | Scope | Checks |
//! |------|-------|--------|
//! | `IdentityAddressFormat` | record | email shape |
//! | `RequiredIdentityFields` | resolved | name and email present |
//! | `NoEmbeddedSecrets` | record | no private keys, passwords or tokens in any field |
//! | `SigningConsistency` | resolved | merged signing group is usable |
//! | `ExtensionKeySafety` | record | extension keys and values are safe to hand to git |
//!
//! # Example
//!
//! ```
//! use gitpersona_profile::{Profile, ProfileName, ResolvedProfile};
//! use gitpersona_validation::Validator;
//!
//! let profile = Profile::new(ProfileName::new("work")?)
//!     .with_identity_name("W")
//!     .with_email("w@example.com");
//! let report = Validator::new().validate(&ResolvedProfile::from_record(&profile));
//! assert!(report.is_acceptable());
//! # Ok::<(), gitpersona_errors::ProfileError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod prelude;
pub mod report;
pub mod rules;
pub mod validator;

pub use report::{RuleOutcome, Severity, ValidationReport, Violation};
pub use validator::{Rule, RuleError, Validator};

//! Centralized error types for gitpersona
//!
//! Every layer of the profile switcher reports failures through typed
//! errors that share one classification scheme, so front ends can decide
//! how to present a failure without matching on every concrete variant.
//!
//! # Architecture
//!
//! - [`common`]: [`ErrorCode`], [`ErrorSeverity`] and the [`Classify`] trait
//! - [`profile`]: profile naming, schema and inheritance errors
//! - [`store`]: atomic store (filesystem) errors
//! - [`backend`]: external configuration backend errors
//!
//! # Example
//!
//! ```
//! use gitpersona_errors::prelude::*;
//!
//! let err = ProfileError::circular_inheritance(["a", "b", "a"]);
//! assert_eq!(err.code(), ErrorCode::CircularInheritance);
//! assert_eq!(err.to_string(), "circular profile inheritance: a -> b -> a");
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backend;
pub mod common;
pub mod prelude;
pub mod profile;
pub mod store;

pub use backend::BackendError;
pub use common::{Classify, ErrorCode, ErrorSeverity};
pub use profile::ProfileError;
pub use store::StoreError;

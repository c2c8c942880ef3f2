//! Shared test utilities for gitpersona.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`fixtures`] - Ready-made profiles
//! - [`mock`] - A configuration backend that fails on request
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! gitpersona-test-helpers = { workspace = true }
//! ```
//!
//! Crates that this one depends on may only use it from their `tests/`
//! directory, where they are linked as ordinary dependencies.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod fixtures;
pub mod mock;
pub mod must;
pub mod prelude;

pub use must::*;

//! Prelude module for convenient error handling imports.

pub use crate::{
    backend::BackendError,
    common::{Classify, ErrorCode, ErrorSeverity},
    profile::ProfileError,
    store::StoreError,
};

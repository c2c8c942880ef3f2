//! Snapshot tests for error message formatting.
//!
//! Front ends print these messages verbatim, so they must stay stable.

use gitpersona_errors::prelude::*;
use insta::assert_snapshot;
use std::io;

mod profile_error_snapshots {
    use super::*;

    #[test]
    fn test_not_found() {
        assert_snapshot!(ProfileError::not_found("work").to_string(), @"profile not found: work");
    }

    #[test]
    fn test_parent_not_found() {
        assert_snapshot!(
            ProfileError::parent_not_found("base", "work").to_string(),
            @"parent profile 'base' of 'work' not found"
        );
    }

    #[test]
    fn test_circular_inheritance() {
        assert_snapshot!(
            ProfileError::circular_inheritance(["a", "b", "a"]).to_string(),
            @"circular profile inheritance: a -> b -> a"
        );
    }

    #[test]
    fn test_chain_too_deep() {
        let err = ProfileError::ChainTooDeep {
            depth: 9,
            max_depth: 8,
        };
        assert_snapshot!(err.to_string(), @"profile inheritance chain too deep: 9 levels (max: 8)");
    }

    #[test]
    fn test_invalid_name() {
        assert_snapshot!(
            ProfileError::invalid_name("../etc", "contains '..'").to_string(),
            @"invalid profile name '../etc': contains '..'"
        );
    }
}

mod store_error_snapshots {
    use super::*;

    #[test]
    fn test_io() {
        let err = StoreError::io(
            "rename",
            "/profiles/work.json",
            io::Error::other("device busy"),
        );
        assert_snapshot!(err.to_string(), @"rename failed for /profiles/work.json: device busy");
    }

    #[test]
    fn test_permission_denied() {
        let err = StoreError::io(
            "create temp file",
            "/profiles/.work.tmp",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_snapshot!(err.to_string(), @"permission denied: create temp file on /profiles/.work.tmp");
    }

    #[test]
    fn test_already_exists() {
        let err = StoreError::AlreadyExists {
            name: "work".into(),
        };
        assert_snapshot!(err.to_string(), @"profile 'work' already exists");
    }
}

mod backend_error_snapshots {
    use super::*;

    #[test]
    fn test_invalid_key() {
        let err = BackendError::InvalidKey {
            key: "--global".into(),
            reason: "keys must not start with '-'",
        };
        assert_snapshot!(err.to_string(), @"refusing configuration key '--global': keys must not start with '-'");
    }
}

//! Unit tests for error classification and conversions.

use gitpersona_errors::prelude::*;
use std::io;

mod classification {
    use super::*;

    #[test]
    fn test_profile_codes() {
        let cases = [
            (ProfileError::not_found("x"), ErrorCode::NotFound),
            (
                ProfileError::invalid_name("", "empty"),
                ErrorCode::InvalidName,
            ),
            (
                ProfileError::parent_not_found("p", "c"),
                ErrorCode::ParentNotFound,
            ),
            (
                ProfileError::circular_inheritance(["a", "a"]),
                ErrorCode::CircularInheritance,
            ),
            (
                ProfileError::ChainTooDeep {
                    depth: 9,
                    max_depth: 8,
                },
                ErrorCode::ChainTooDeep,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(err.code(), code, "{err}");
            assert_eq!(err.severity(), ErrorSeverity::Error);
        }
    }

    #[test]
    fn test_store_codes() {
        assert_eq!(StoreError::not_found("x").code(), ErrorCode::NotFound);
        assert_eq!(
            StoreError::invalid_format("/p/x.json", "bad json").code(),
            ErrorCode::InvalidFormat
        );
        assert_eq!(
            StoreError::LockUnavailable {
                path: "/p/.locks/x.lock".into(),
                source: io::Error::from(io::ErrorKind::WouldBlock),
            }
            .code(),
            ErrorCode::LockUnavailable
        );
    }

    #[test]
    fn test_backend_errors_classify_as_apply_failures() {
        let err = BackendError::Unavailable {
            program: "git".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.code(), ErrorCode::ExternalApplyFailed);
    }
}

mod conversions {
    use super::*;

    #[test]
    fn test_store_error_into_profile_error() {
        let err: ProfileError = StoreError::io("read", "/p/x.json", io::Error::other("eio")).into();
        assert!(matches!(err, ProfileError::Store(StoreError::Io { .. })));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_errors_are_std_errors() {
        let _: &dyn std::error::Error = &ProfileError::not_found("x");
        let _: &dyn std::error::Error = &StoreError::not_found("x");
        let _: &dyn std::error::Error =
            &BackendError::command_failed("get", "local", "user.name", None, "boom");
    }

    #[test]
    fn test_io_source_is_preserved() {
        use std::error::Error as _;

        let err = StoreError::io("fsync", "/p", io::Error::other("eio"));
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("eio"));
    }
}

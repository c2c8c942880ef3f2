//! Git configuration keys written for the fixed profile fields.

/// `user.name`
pub const USER_NAME: &str = "user.name";
/// `user.email`
pub const USER_EMAIL: &str = "user.email";
/// `gpg.format`, the signing format selector
pub const GPG_FORMAT: &str = "gpg.format";
/// `gpg.x509.program`, the program used for x509-format signing
pub const GPG_X509_PROGRAM: &str = "gpg.x509.program";
/// `user.signingkey`
pub const USER_SIGNINGKEY: &str = "user.signingkey";
/// `commit.gpgsign`
pub const COMMIT_GPGSIGN: &str = "commit.gpgsign";
/// `tag.gpgsign`
pub const TAG_GPGSIGN: &str = "tag.gpgsign";

/// Managed keys in application order. `gpg.format` comes before
/// `user.signingkey` because git interprets the key according to the format.
pub const MANAGED_KEYS: [&str; 7] = [
    USER_NAME,
    USER_EMAIL,
    GPG_FORMAT,
    GPG_X509_PROGRAM,
    USER_SIGNINGKEY,
    COMMIT_GPGSIGN,
    TAG_GPGSIGN,
];

/// Whether `key` names a managed key. Git section and variable names are
/// case-insensitive, so the comparison is too.
pub fn is_managed(key: &str) -> bool {
    MANAGED_KEYS.iter().any(|m| m.eq_ignore_ascii_case(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selector_precedes_signing_key() {
        let pos = |k: &str| MANAGED_KEYS.iter().position(|m| *m == k);
        assert!(pos(GPG_FORMAT) < pos(USER_SIGNINGKEY));
    }

    #[test]
    fn test_is_managed_ignores_case() {
        assert!(is_managed("User.Email"));
        assert!(!is_managed("core.editor"));
    }
}

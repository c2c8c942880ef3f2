use gitpersona_profile::{ResolvedProfile, SigningMethod, fields};

use crate::report::Violation;
use crate::validator::Rule;

/// The merged signing group must be complete and coherent.
///
/// Inheritance merges signing fields one by one, so a group can combine a
/// method from one profile with a key from another; this rule decides
/// whether the result is usable as a whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigningConsistency;

impl Rule for SigningConsistency {
    fn id(&self) -> &str {
        "SigningConsistency"
    }

    fn check(&self, profile: &ResolvedProfile) -> Vec<Violation> {
        let Some(signing) = &profile.signing else {
            return Vec::new();
        };
        let mut violations = Vec::new();

        match signing.method {
            None => {
                if signing.key.is_some() {
                    violations.push(
                        Violation::blocking(
                            fields::SIGNING_KEY,
                            "signing key is set without a signing method",
                        )
                        .with_hint("set signing.method to ssh, gpg, x509 or keyless"),
                    );
                }
                if signing.sign_commits.is_some() || signing.sign_tags.is_some() {
                    violations.push(
                        Violation::blocking(
                            fields::SIGNING_METHOD,
                            "signing flags are set without a signing method",
                        )
                        .with_hint("set signing.method or remove sign_commits/sign_tags"),
                    );
                }
            }
            Some(method) if method.requires_key() => {
                if signing.key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                    violations.push(
                        Violation::blocking(
                            fields::SIGNING_KEY,
                            format!("{method} signing requires a key"),
                        )
                        .with_hint(key_hint(method)),
                    );
                }
            }
            Some(_) => {
                if signing.key.is_some() {
                    violations.push(
                        Violation::advisory(
                            fields::SIGNING_KEY,
                            "keyless signing ignores the configured key",
                        )
                        .with_hint("remove signing.key or choose a key-based method"),
                    );
                }
            }
        }

        if signing.method.is_some()
            && signing.sign_commits == Some(false)
            && signing.sign_tags != Some(true)
        {
            violations.push(
                Violation::advisory(
                    fields::SIGNING_SIGN_COMMITS,
                    "a signing method is configured but nothing is signed",
                )
                .with_hint("enable sign_commits or sign_tags"),
            );
        }

        violations
    }
}

fn key_hint(method: SigningMethod) -> &'static str {
    match method {
        SigningMethod::Ssh => "set signing.key to the public key path, e.g. ~/.ssh/id_ed25519.pub",
        SigningMethod::Gpg => "set signing.key to the key fingerprint or id",
        SigningMethod::X509 => "set signing.key to the certificate id",
        SigningMethod::Keyless => "keyless signing needs no key",
    }
}

//! Ready-made profiles.
//!
//! `base` sets only the address; `work` inherits it and sets the name, the
//! pair used throughout the inheritance tests.

use gitpersona_profile::{Profile, ProfileName, SigningConfig, SigningMethod};

use crate::must::must;

/// A valid profile name.
///
/// # Panics
///
/// Panics if `s` is not a valid name.
#[track_caller]
pub fn name(s: &str) -> ProfileName {
    must(ProfileName::new(s))
}

/// `base`: address `a@x.com`, no parent.
pub fn base_profile() -> Profile {
    Profile::new(name("base")).with_email("a@x.com")
}

/// `work`: parent `base`, identity name `W`.
pub fn work_profile() -> Profile {
    Profile::new(name("work"))
        .with_parent(name("base"))
        .with_identity_name("W")
}

/// A self-contained profile signing commits with an SSH key.
pub fn signed_profile(profile_name: &str) -> Profile {
    Profile::new(name(profile_name))
        .with_identity_name("Signer")
        .with_email("signer@example.com")
        .with_signing(
            SigningConfig::with_method(SigningMethod::Ssh)
                .key("~/.ssh/id_ed25519.pub")
                .sign_commits(true),
        )
}

/// A chain `p0 <- p1 <- ... <- p{len-1}`; the last element is the leaf.
pub fn chain(len: usize) -> Vec<Profile> {
    (0..len)
        .map(|i| {
            let profile = Profile::new(name(&format!("p{i}")));
            if i == 0 {
                profile.with_email("root@example.com")
            } else {
                profile
                    .with_parent(name(&format!("p{}", i - 1)))
                    .with_identity_name(format!("Level {i}"))
            }
        })
        .collect()
}

//! Property tests for inheritance resolution.

use gitpersona_profile::prelude::*;
use gitpersona_test_helpers::must;
use proptest::prelude::*;

fn arb_identity() -> impl Strategy<Value = (Option<String>, Option<String>)> {
    (
        proptest::option::of("[A-Z][a-z]{1,8}"),
        proptest::option::of("[a-z]{1,6}@[a-z]{1,6}\\.(com|org)"),
    )
}

fn arb_chain() -> impl Strategy<Value = Vec<(Option<String>, Option<String>, Vec<(String, i64)>)>> {
    proptest::collection::vec(
        (
            arb_identity(),
            proptest::collection::vec(("[a-z]{1,4}\\.[a-z]{1,6}", any::<i64>()), 0..3),
        )
            .prop_map(|((name, email), ext)| (name, email, ext)),
        1..=MAX_INHERITANCE_DEPTH,
    )
}

/// Build `p0 -> p1 -> ... -> pN` (p0 is the leaf).
fn build(chain: &[(Option<String>, Option<String>, Vec<(String, i64)>)]) -> InMemoryProfileSource {
    chain
        .iter()
        .enumerate()
        .map(|(i, (name, email, ext))| {
            let mut profile = Profile::new(must(ProfileName::new(format!("p{i}"))));
            if i + 1 < chain.len() {
                profile = profile.with_parent(must(ProfileName::new(format!("p{}", i + 1))));
            }
            profile.identity.name = name.clone();
            profile.identity.email = email.clone();
            for (key, value) in ext {
                profile = profile.with_extension(key.clone(), *value);
            }
            profile
        })
        .collect()
}

proptest! {
    #[test]
    fn test_prop_resolution_is_deterministic(chain in arb_chain()) {
        let source = build(&chain);
        let leaf = must(ProfileName::new("p0"));

        let first = must(resolve(&source, &leaf));
        let second = must(resolve(&source, &leaf));
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.inheritance_chain.len(), chain.len());
    }

    #[test]
    fn test_prop_nearest_definition_wins(chain in arb_chain()) {
        let source = build(&chain);
        let resolved = must(resolve(&source, &must(ProfileName::new("p0"))));

        let expected = chain.iter().enumerate().find_map(|(i, (_, email, _))| {
            email.as_ref().map(|e| (format!("p{i}"), e.clone()))
        });
        match expected {
            Some((owner, email)) => {
                prop_assert_eq!(resolved.identity.email.as_deref(), Some(email.as_str()));
                prop_assert_eq!(
                    resolved.provenance.source_of(fields::IDENTITY_EMAIL).map(ProfileName::as_str),
                    Some(owner.as_str())
                );
            }
            None => {
                prop_assert!(resolved.identity.email.is_none());
                prop_assert!(resolved.provenance.source_of(fields::IDENTITY_EMAIL).is_none());
            }
        }
    }

    #[test]
    fn test_prop_every_provenance_entry_names_a_chain_member(chain in arb_chain()) {
        let source = build(&chain);
        let resolved = must(resolve(&source, &must(ProfileName::new("p0"))));
        for (_, owner) in resolved.provenance.iter() {
            prop_assert!(resolved.inheritance_chain.contains(owner));
        }
    }

    #[test]
    fn test_prop_cycles_terminate(len in 1usize..=MAX_INHERITANCE_DEPTH) {
        // p0 -> p1 -> ... -> p{len-1} -> p0
        let source: InMemoryProfileSource = (0..len)
            .map(|i| {
                Profile::new(must(ProfileName::new(format!("p{i}"))))
                    .with_parent(must(ProfileName::new(format!("p{}", (i + 1) % len))))
            })
            .collect();
        let result = resolve(&source, &must(ProfileName::new("p0")));
        let is_cycle = matches!(
            result,
            Err(gitpersona_errors::ProfileError::CircularInheritance { .. })
        );
        prop_assert!(is_cycle);
    }
}

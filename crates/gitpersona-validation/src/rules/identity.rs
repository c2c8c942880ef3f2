use gitpersona_profile::{ResolvedProfile, fields};

use crate::report::Violation;
use crate::validator::Rule;

/// Narrow `local@domain.tld` shape check on the identity address.
///
/// Deliberately not a full address grammar: quoted local parts, IP literals
/// and comments are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAddressFormat;

impl Rule for IdentityAddressFormat {
    fn id(&self) -> &str {
        "IdentityAddressFormat"
    }

    fn is_record_local(&self) -> bool {
        true
    }

    fn check(&self, profile: &ResolvedProfile) -> Vec<Violation> {
        let Some(email) = profile.identity.email.as_deref() else {
            return Vec::new();
        };
        // An empty address is reported by RequiredIdentityFields.
        if email.trim().is_empty() {
            return Vec::new();
        }
        match address_problem(email) {
            Some(problem) => vec![
                Violation::blocking(
                    fields::IDENTITY_EMAIL,
                    format!("identity address is not of the form local@domain.tld: {problem}"),
                )
                .with_hint("use an address such as name@example.com"),
            ],
            None => Vec::new(),
        }
    }
}

fn address_problem(email: &str) -> Option<&'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Some("missing '@'");
    };
    if domain.contains('@') {
        return Some("more than one '@'");
    }
    if local.is_empty() {
        return Some("empty local part");
    }
    if local
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"' | ',' | ';'))
    {
        return Some("local part contains a forbidden character");
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Some("misplaced '.' in local part");
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Some("domain has no '.'");
    }
    for label in &labels {
        if label.is_empty() {
            return Some("empty domain label");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Some("domain label starts or ends with '-'");
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Some("domain contains a forbidden character");
        }
    }
    match labels.last() {
        Some(tld) if tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()) => None,
        _ => Some("top-level domain must be at least two letters"),
    }
}

/// Identity name and address must both be present and non-blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredIdentityFields;

impl Rule for RequiredIdentityFields {
    fn id(&self) -> &str {
        "RequiredIdentityFields"
    }

    fn check(&self, profile: &ResolvedProfile) -> Vec<Violation> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        let mut violations = Vec::new();
        if blank(&profile.identity.name) {
            violations.push(
                Violation::blocking(fields::IDENTITY_NAME, "identity name is missing")
                    .with_hint("set identity.name on this profile or an ancestor"),
            );
        }
        if blank(&profile.identity.email) {
            violations.push(
                Violation::blocking(fields::IDENTITY_EMAIL, "identity address is missing")
                    .with_hint("set identity.email on this profile or an ancestor"),
            );
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_addresses() {
        for email in ["a@x.com", "first.last+tag@mail.example.org", "u_1@sub-domain.io"] {
            assert_eq!(address_problem(email), None, "{email}");
        }
    }

    #[test]
    fn test_rejected_addresses() {
        for email in [
            "plain",
            "@x.com",
            "a@b@c.com",
            "a@localhost",
            "a b@x.com",
            "a@x..com",
            "a@-x.com",
            "a@x.c",
            "a@x.c0m",
            ".a@x.com",
            "<a@x.com>",
        ] {
            assert!(address_problem(email).is_some(), "{email}");
        }
    }
}

use gitpersona_profile::{ResolvedProfile, ScalarValue, fields, keys};

use crate::report::Violation;
use crate::validator::Rule;

/// Extension keys must be plain git `section[.subsection].name` keys from a
/// safe character set and must not collide with managed keys; values must
/// be single-line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionKeySafety;

impl Rule for ExtensionKeySafety {
    fn id(&self) -> &str {
        "ExtensionKeySafety"
    }

    fn is_record_local(&self) -> bool {
        true
    }

    fn check(&self, profile: &ResolvedProfile) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (key, value) in &profile.extensions {
            let field = fields::extension(key);
            if let Some(problem) = key_problem(key) {
                violations.push(
                    Violation::blocking(field.clone(), format!("extension key {key:?} {problem}"))
                        .with_hint("use keys like core.editor or url.example.insteadOf"),
                );
            } else if keys::is_managed(key) {
                violations.push(
                    Violation::blocking(
                        field.clone(),
                        format!("extension key '{key}' is managed by the profile itself"),
                    )
                    .with_hint("set the corresponding identity or signing field instead"),
                );
            }
            if let ScalarValue::String(s) = value {
                if s.contains(['\n', '\r', '\0']) {
                    violations.push(
                        Violation::blocking(field, "extension value contains a line break or NUL")
                            .with_hint("extension values must be a single line"),
                    );
                }
            }
        }
        violations
    }
}

fn key_problem(key: &str) -> Option<&'static str> {
    if key.starts_with('-') {
        return Some("must not start with '-'");
    }
    let Some((section, rest)) = key.split_once('.') else {
        return Some("must have the form section.name");
    };
    let (subsection, name) = match rest.rsplit_once('.') {
        Some((subsection, name)) => (Some(subsection), name),
        None => (None, rest),
    };
    if section.is_empty() || !section.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Some("has an invalid section name");
    }
    if let Some(subsection) = subsection {
        if subsection.is_empty()
            || !subsection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':'))
        {
            return Some("has an invalid subsection");
        }
    }
    match name.chars().next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return Some("has a variable name that does not start with a letter"),
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Some("has an invalid variable name");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        for key in [
            "core.editor",
            "pull.rebase",
            "url.https://example.com/.insteadOf",
            "branch.main.remote",
            "diff-so-fancy.markEmptyLines",
        ] {
            assert_eq!(key_problem(key), None, "{key}");
        }
    }

    #[test]
    fn test_invalid_keys() {
        for key in [
            "editor",
            "-c.x",
            ".name",
            "core.",
            "core.1st",
            "core.ed itor",
            "core.editor\n",
            "sec tion.name",
            "a..b",
            "a.b\"c.d",
        ] {
            assert!(key_problem(key).is_some(), "{key:?}");
        }
    }
}

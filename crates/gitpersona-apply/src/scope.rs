//! Git configuration scopes.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A layer of git configuration, narrowest first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The repository's `.git/config`
    #[default]
    Local,
    /// The user's `~/.gitconfig`
    Global,
    /// The installation-wide `/etc/gitconfig`
    System,
}

impl Scope {
    /// Every scope, narrowest first.
    pub const ALL: [Scope; 3] = [Scope::Local, Scope::Global, Scope::System];

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Global => "global",
            Scope::System => "system",
        }
    }

    /// `git config` flag selecting this scope.
    pub fn flag(self) -> &'static str {
        match self {
            Scope::Local => "--local",
            Scope::Global => "--global",
            Scope::System => "--system",
        }
    }

    /// Scopes that take precedence over this one.
    pub fn narrower(self) -> impl Iterator<Item = Scope> {
        Scope::ALL.into_iter().filter(move |s| *s < self)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown configuration scope '{0}' (expected local, global or system)")]
pub struct ParseScopeError(String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseScopeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrower_scopes() {
        assert_eq!(Scope::Local.narrower().count(), 0);
        assert_eq!(Scope::System.narrower().collect::<Vec<_>>(), vec![
            Scope::Local,
            Scope::Global
        ]);
    }

    #[test]
    fn test_parse() -> Result<(), ParseScopeError> {
        assert_eq!("Global".parse::<Scope>()?, Scope::Global);
        assert!("worktree".parse::<Scope>().is_err());
        Ok(())
    }
}

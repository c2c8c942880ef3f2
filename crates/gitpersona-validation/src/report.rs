//! Validation results.

use core::fmt;

use gitpersona_profile::ProfileName;
use serde::Serialize;

/// How a violation affects applying the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Surfaced to the user, does not prevent applying
    Advisory,
    /// Prevents applying
    Blocking,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Advisory => f.write_str("advisory"),
            Severity::Blocking => f.write_str("blocking"),
        }
    }
}

/// One rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Id of the rule that reported it; filled in by the validator
    pub rule: String,
    /// Blocking or advisory
    pub severity: Severity,
    /// Field path involved, e.g. `identity.email`
    pub field: String,
    /// What is wrong
    pub message: String,
    /// How to fix it
    pub hint: String,
}

impl Violation {
    fn new(severity: Severity, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: String::new(),
            severity,
            field: field.into(),
            message: message.into(),
            hint: String::new(),
        }
    }

    /// A blocking violation.
    pub fn blocking(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Blocking, field, message)
    }

    /// An advisory violation.
    pub fn advisory(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Advisory, field, message)
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    /// Whether this violation blocks applying.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.severity, self.rule, self.field, self.message
        )?;
        if !self.hint.is_empty() {
            write!(f, " (hint: {})", self.hint)?;
        }
        Ok(())
    }
}

/// Outcome of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    /// Rule id
    pub rule: String,
    /// Violations; empty when the rule passed
    pub violations: Vec<Violation>,
}

impl RuleOutcome {
    /// Whether the rule reported nothing.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Every rule outcome for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Profile that was validated
    pub profile: ProfileName,
    /// Outcomes in rule registration order
    pub outcomes: Vec<RuleOutcome>,
}

impl ValidationReport {
    /// Whether the profile may be applied: no blocking violations.
    pub fn is_acceptable(&self) -> bool {
        self.blocking().next().is_none()
    }

    /// All violations in rule order.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.outcomes.iter().flat_map(|o| o.violations.iter())
    }

    /// Blocking violations.
    pub fn blocking(&self) -> impl Iterator<Item = &Violation> {
        self.violations().filter(|v| v.is_blocking())
    }

    /// Advisory violations.
    pub fn advisories(&self) -> impl Iterator<Item = &Violation> {
        self.violations().filter(|v| !v.is_blocking())
    }

    /// Outcome of the rule with `id`, if it ran.
    pub fn outcome(&self, id: &str) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.rule == id)
    }

    /// Whether the rule with `id` reported a blocking violation.
    pub fn is_blocked_by(&self, id: &str) -> bool {
        self.blocking().any(|v| v.rule == id)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocking = self.blocking().count();
        let advisory = self.advisories().count();
        if blocking == 0 && advisory == 0 {
            return write!(
                f,
                "profile '{}': all {} rules passed",
                self.profile,
                self.outcomes.len()
            );
        }
        write!(
            f,
            "profile '{}': {blocking} blocking, {advisory} advisory",
            self.profile
        )?;
        for violation in self.violations() {
            write!(f, "\n  {violation}")?;
        }
        Ok(())
    }
}

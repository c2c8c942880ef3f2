//! The rule pipeline.

use gitpersona_errors::{Classify, ErrorCode};
use gitpersona_profile::{Profile, ResolvedProfile};
use tracing::{debug, info};

use crate::report::{RuleOutcome, ValidationReport, Violation};
use crate::rules;

/// A validation rule.
pub trait Rule: Send + Sync {
    /// Stable identifier, unique within a [`Validator`].
    fn id(&self) -> &str;

    /// Whether the rule is meaningful for a single stored record, before
    /// inheritance. Partial base profiles legitimately fail the other rules.
    fn is_record_local(&self) -> bool {
        false
    }

    /// Check `profile`, returning every violation found.
    fn check(&self, profile: &ResolvedProfile) -> Vec<Violation>;
}

/// Errors from editing a [`Validator`]'s rule set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A rule with that id is already registered
    #[error("validation rule '{0}' is already registered")]
    Duplicate(String),
    /// No rule with that id is registered
    #[error("validation rule '{0}' is not registered")]
    Unknown(String),
}

impl Classify for RuleError {
    fn code(&self) -> ErrorCode {
        ErrorCode::Config
    }
}

/// Runs every registered rule and collects all outcomes.
pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
}

impl Validator {
    /// A validator with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// A validator with the built-in rules.
    pub fn new() -> Self {
        Self {
            rules: rules::builtin(),
        }
    }

    /// Ids of the registered rules, in run order.
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.id() == id)
    }

    /// Add a rule to the end of the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Duplicate`] if a rule with the same id exists.
    pub fn register(&mut self, rule: impl Rule + 'static) -> Result<(), RuleError> {
        if self.position(rule.id()).is_some() {
            return Err(RuleError::Duplicate(rule.id().to_string()));
        }
        debug!(rule = rule.id(), "registered validation rule");
        self.rules.push(Box::new(rule));
        Ok(())
    }

    /// Replace the rule with the same id, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Unknown`] if no rule has that id.
    pub fn replace(&mut self, rule: impl Rule + 'static) -> Result<(), RuleError> {
        let Some(slot) = self
            .position(rule.id())
            .and_then(|index| self.rules.get_mut(index))
        else {
            return Err(RuleError::Unknown(rule.id().to_string()));
        };
        debug!(rule = rule.id(), "replaced validation rule");
        *slot = Box::new(rule);
        Ok(())
    }

    /// Remove the rule with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Unknown`] if no rule has that id.
    pub fn remove(&mut self, id: &str) -> Result<(), RuleError> {
        let index = self
            .position(id)
            .ok_or_else(|| RuleError::Unknown(id.to_string()))?;
        self.rules.remove(index);
        debug!(rule = id, "removed validation rule");
        Ok(())
    }

    /// Validate a resolved profile against every rule.
    pub fn validate(&self, profile: &ResolvedProfile) -> ValidationReport {
        self.run(profile, |_| true)
    }

    /// Validate a single stored record against the record-local rules only.
    pub fn validate_record(&self, record: &Profile) -> ValidationReport {
        self.run(&ResolvedProfile::from_record(record), |rule| {
            rule.is_record_local()
        })
    }

    fn run(&self, profile: &ResolvedProfile, include: impl Fn(&dyn Rule) -> bool) -> ValidationReport {
        let outcomes: Vec<RuleOutcome> = self
            .rules
            .iter()
            .filter(|rule| include(rule.as_ref()))
            .map(|rule| {
                let mut violations = rule.check(profile);
                for violation in &mut violations {
                    violation.rule = rule.id().to_string();
                }
                debug!(
                    profile = %profile.name,
                    rule = rule.id(),
                    violations = violations.len(),
                    "ran validation rule"
                );
                RuleOutcome {
                    rule: rule.id().to_string(),
                    violations,
                }
            })
            .collect();

        let report = ValidationReport {
            profile: profile.name.clone(),
            outcomes,
        };
        info!(
            profile = %report.profile,
            rules = report.outcomes.len(),
            blocking = report.blocking().count(),
            advisory = report.advisories().count(),
            "validated profile"
        );
        report
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Validator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rule_ids())
            .finish()
    }
}

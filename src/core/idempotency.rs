//! Existence checks for compiled rules
//!
//! firewall-cmd has no structured query for direct rules, so a rule counts as
//! installed when some line of the dump contains its text. The engine may
//! print the comment clause without the quotes fwrule emits, so every quote
//! in the compiled text is optional in the match.

use regex::Regex;
use tracing::{debug, warn};

use crate::core::error::{Error, Result};
use crate::core::store::FirewallRuleStore;
use crate::executor::CommandExecutor;

/// Decides whether a compiled rule is already installed
pub trait IdempotencyChecker {
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for an empty rule. A failed lookup is
    /// not an error: the rule is reported absent.
    fn exists(&self, rule_text: &str) -> Result<bool>;
}

/// Builds the containment pattern for a rule: literal text, quotes optional.
///
/// # Errors
///
/// Returns `Error::Regex` if the pattern exceeds the regex size limit.
pub fn rule_pattern(rule_text: &str) -> Result<Regex> {
    let escaped = regex::escape(rule_text).replace('\'', "'*");
    Ok(Regex::new(&escaped)?)
}

impl<E: CommandExecutor> IdempotencyChecker for FirewallRuleStore<E> {
    fn exists(&self, rule_text: &str) -> Result<bool> {
        if rule_text.trim().is_empty() {
            return Err(Error::InvalidArgument("no rule supplied".to_string()));
        }

        let pattern = rule_pattern(rule_text)?;

        match self.contains_match(&pattern) {
            Ok(found) => Ok(found),
            Err(Error::QueryFailed(reason)) => {
                debug!("Check failed with: {reason}");
                warn!("Assuming rule does not exist: {rule_text}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

//! Direct-rule storage backed by firewall-cmd
//!
//! The engine is the only source of truth for which rules are installed;
//! nothing is cached in-process. Every query re-reads the full direct-rule
//! dump.

use regex::Regex;
use tracing::{error, info};

use crate::core::error::{Error, Result};
use crate::executor::{CommandExecutor, quote_arg};

/// Engine binary used when no other is configured
pub const DEFAULT_FIREWALL_CMD: &str = "firewall-cmd";

/// Repository view of the engine's direct rules
#[derive(Debug)]
pub struct FirewallRuleStore<E> {
    executor: E,
    binary: String,
}

impl<E: CommandExecutor> FirewallRuleStore<E> {
    pub fn new(executor: E) -> Self {
        Self::with_binary(executor, DEFAULT_FIREWALL_CMD)
    }

    pub fn with_binary(executor: E, binary: impl Into<String>) -> Self {
        Self {
            executor,
            binary: binary.into(),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn direct(&self, args: &str) -> String {
        format!("{} --direct {args}", quote_arg(&self.binary))
    }

    /// Every installed direct rule, one per line of the dump.
    ///
    /// # Errors
    ///
    /// Returns `Error::QueryFailed` if the dump command fails for any reason.
    pub fn list_all(&self) -> Result<Vec<String>> {
        let command = self.direct("--get-all-rules");
        let output = self
            .executor
            .run(&command)
            .map_err(|e| Error::QueryFailed(e.stderr().map_or_else(|| e.to_string(), String::from)))?;

        Ok(output
            .stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Whether any installed rule contains a match for `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `Error::QueryFailed` if the dump cannot be retrieved.
    pub fn contains_match(&self, pattern: &Regex) -> Result<bool> {
        Ok(self.list_all()?.iter().any(|line| pattern.is_match(line)))
    }

    /// Installs a rule.
    ///
    /// # Errors
    ///
    /// Returns `Error::CommandFailed` if the engine rejects the rule.
    pub fn add_rule(&self, rule: &str) -> Result<()> {
        self.mutate("--add-rule", rule)
    }

    /// Deletes a rule.
    ///
    /// # Errors
    ///
    /// Returns `Error::CommandFailed` if the engine refuses the deletion.
    pub fn remove_rule(&self, rule: &str) -> Result<()> {
        self.mutate("--remove-rule", rule)
    }

    fn mutate(&self, verb: &str, rule: &str) -> Result<()> {
        let command = self.direct(&format!("{verb} {rule}"));
        match self.executor.run(&command) {
            Ok(_) => {
                info!("Ran: {command}");
                Ok(())
            }
            Err(e) => {
                error!("Failed: {command}: {e}");
                Err(e)
            }
        }
    }
}

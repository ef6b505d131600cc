//! Shared test utilities for core module tests
//!
//! Provides common test helpers to avoid duplication across test suites.
//! This module is only compiled in test mode.

use std::cell::{Cell, RefCell};
use std::sync::Mutex;

use crate::core::error::{Error, Result};
use crate::core::rule::{Direction, PortSpec, Protocol, RuleDescriptor};
use crate::executor::{CommandExecutor, CommandOutput};

/// Mutex for tests that need exclusive access to environment variables.
///
/// # Example
///
/// ```ignore
/// let _guard = ENV_VAR_MUTEX.lock().unwrap();
/// unsafe {
///     std::env::set_var("FWRULE_ELEVATION_METHOD", "sudo");
/// }
/// // ... test with custom env state ...
/// unsafe {
///     std::env::remove_var("FWRULE_ELEVATION_METHOD");
/// }
/// ```
pub static ENV_VAR_MUTEX: Mutex<()> = Mutex::new(());

const PREFIX: &str = "firewall-cmd --direct ";

/// In-memory stand-in for firewalld's direct interface.
///
/// Records every command line it receives. Installed rules are echoed back
/// the way firewalld prints them: without the quotes around comments.
#[derive(Debug, Default)]
pub struct MockFirewall {
    rules: RefCell<Vec<String>>,
    commands: RefCell<Vec<String>>,
    queries_fail: Cell<bool>,
    mutations_fail: Cell<bool>,
}

impl MockFirewall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with rules already installed, stored as given
    pub fn with_rules(rules: &[&str]) -> Self {
        let mock = Self::new();
        mock.rules
            .borrow_mut()
            .extend(rules.iter().map(|r| (*r).to_string()));
        mock
    }

    pub fn fail_queries(&self) {
        self.queries_fail.set(true);
    }

    pub fn fail_mutations(&self) {
        self.mutations_fail.set(true);
    }

    pub fn installed(&self) -> Vec<String> {
        self.rules.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    /// Add and remove commands only
    pub fn mutations(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c.contains("--add-rule") || c.contains("--remove-rule"))
            .cloned()
            .collect()
    }

    fn echo(rule: &str) -> String {
        rule.replace('\'', "")
    }

    fn failure(command: &str, stderr: &str) -> Error {
        Error::CommandFailed {
            command: command.to_string(),
            stderr: stderr.to_string(),
            exit_code: Some(252),
        }
    }
}

impl CommandExecutor for MockFirewall {
    fn run(&self, command_line: &str) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(command_line.to_string());

        let Some(args) = command_line.strip_prefix(PREFIX) else {
            return Err(Self::failure(command_line, "command not found"));
        };

        if args == "--get-all-rules" {
            if self.queries_fail.get() {
                return Err(Self::failure(command_line, "FirewallD is not running"));
            }
            let mut dump = self.rules.borrow().join("\n");
            dump.push('\n');
            return Ok(CommandOutput::success(dump));
        }

        if self.mutations_fail.get() {
            return Err(Self::failure(command_line, "Error: COMMAND_FAILED"));
        }

        if let Some(rule) = args.strip_prefix("--add-rule ") {
            let echoed = Self::echo(rule);
            let mut rules = self.rules.borrow_mut();
            if !rules.contains(&echoed) {
                rules.push(echoed);
            }
            return Ok(CommandOutput::success(""));
        }

        if let Some(rule) = args.strip_prefix("--remove-rule ") {
            let echoed = Self::echo(rule);
            self.rules.borrow_mut().retain(|r| *r != echoed);
            return Ok(CommandOutput::success(""));
        }

        Err(Self::failure(command_line, "Error: INVALID_COMMAND"))
    }
}

/// Inbound TCP rule on one port, the canonical test descriptor.
pub fn create_test_rule(description: &str, port: Option<u16>) -> RuleDescriptor {
    RuleDescriptor {
        name: description.to_lowercase().replace(' ', "_"),
        direction: Some(Direction::In),
        protocol: Some(Protocol::Tcp),
        port: port.map(PortSpec::single),
        description: Some(description.to_string()),
        ..RuleDescriptor::default()
    }
}

/// Test rule with an address, which pins it to one family.
pub fn create_addressed_test_rule(description: &str, source: &str) -> RuleDescriptor {
    RuleDescriptor {
        source: Some(source.to_string()),
        ..create_test_rule(description, Some(22))
    }
}

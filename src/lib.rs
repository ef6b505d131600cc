//! fwrule - idempotent firewalld direct rules
//!
//! Describes *what* traffic to allow, deny, reject, redirect, masquerade or
//! log, and lets fwrule work out the `firewall-cmd --direct` rule text and
//! whether it is already installed.
//!
//! # Architecture
//!
//! - [`core`] - Rule compilation, family selection, existence checks and orchestration
//! - [`executor`] - Running firewall-cmd without a shell
//! - [`elevation`] - Privilege escalation for the engine binary
//! - [`audit`] - Audit log of every rule added or removed
//! - [`validators`] - Descriptor field validation
//! - [`config`] - Configuration loading
//! - [`utils`] - XDG directories
//!
//! # Example
//!
//! ```no_run
//! use fwrule::core::rule::{ActionKind, RuleDescriptor};
//! use fwrule::{FirewallRuleStore, RuleStateManager, SystemExecutor};
//!
//! # fn example() -> fwrule::Result<()> {
//! let rule = RuleDescriptor::from_json(r#"{ "direction": "in", "protocol": "tcp", "port": 22 }"#)?;
//! let manager = RuleStateManager::new(FirewallRuleStore::new(SystemExecutor::new("firewall-cmd")));
//! let report = manager.apply(ActionKind::Allow, &rule)?;
//! println!("changed: {}", report.updated());
//! # Ok(())
//! # }
//! ```

#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

pub mod audit;
pub mod config;
pub mod core;
pub mod elevation;
pub mod executor;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use crate::core::error::{Error, Result};
pub use crate::core::manager::{ConvergeReport, RuleStateManager};
pub use crate::core::rule::{ActionKind, RuleDescriptor};
pub use crate::core::store::FirewallRuleStore;
pub use executor::{CommandExecutor, SystemExecutor};

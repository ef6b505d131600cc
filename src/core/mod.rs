//! Core direct-rule functionality
//!
//! - [`rule`]: Rule descriptors, actions, ports and connection states
//! - [`family`]: Address family selection from address literals
//! - [`compiler`]: Descriptor to `firewall-cmd --direct` rule text
//! - [`store`]: The engine's direct rules, read and written through firewall-cmd
//! - [`idempotency`]: Whether a compiled rule is already installed
//! - [`manager`]: Apply/remove orchestration
//! - [`error`]: Error types for rule operations

pub mod compiler;
pub mod error;
pub mod family;
pub mod idempotency;
pub mod manager;
pub mod rule;
pub mod store;

#[cfg(test)]
pub mod test_helpers;

//! Input validation for rule descriptors
//!
//! Checks run by the descriptor source layer before a rule reaches the
//! compiler. Validators only accept or reject; they never rewrite input,
//! because the compiled text must match what is already installed.

use crate::core::rule::{PortEntry, PortSpec};

/// Validates a rule position within its chain.
///
/// # Errors
///
/// Returns `Err` if the position is 0 (positions start at 1).
pub fn validate_position(position: u32) -> Result<u32, String> {
    if position == 0 {
        Err("Position must be 1 or greater".to_string())
    } else {
        Ok(position)
    }
}

/// Validates a single port number.
///
/// # Errors
///
/// Returns `Err` if port is 0 (reserved).
pub fn validate_port(port: u16) -> Result<u16, String> {
    if port == 0 {
        Err("Port must be between 1 and 65535".to_string())
    } else {
        Ok(port)
    }
}

/// Validates a port range.
///
/// # Errors
///
/// Returns `Err` if:
/// - Either port is 0
/// - Start port is greater than end port
pub fn validate_port_range(start: u16, end: u16) -> Result<(u16, u16), String> {
    validate_port(start)?;
    validate_port(end)?;

    if start > end {
        Err("Start port must be less than or equal to end port".to_string())
    } else {
        Ok((start, end))
    }
}

/// Validates every entry of a multiport specification.
///
/// The multiport match accepts at most 15 ports, a range counting as two.
///
/// # Errors
///
/// Returns `Err` if the list is empty, too long, or holds an invalid entry.
pub fn validate_port_spec(spec: &PortSpec) -> Result<(), String> {
    if spec.is_empty() {
        return Err("Port list cannot be empty".to_string());
    }

    let mut slots = 0;
    for entry in spec.entries() {
        match *entry {
            PortEntry::Single(p) => {
                validate_port(p)?;
                slots += 1;
            }
            PortEntry::Range { start, end } => {
                validate_port_range(start, end)?;
                slots += 2;
            }
        }
    }

    if slots > 15 {
        return Err("Too many ports (multiport allows 15, ranges count twice)".to_string());
    }

    Ok(())
}

/// Validates a network interface name.
///
/// Linux kernel interface name rules:
/// - Max 15 characters (IFNAMSIZ - 1)
/// - Alphanumeric, dot, dash, underscore only
/// - Cannot be "." or ".."
///
/// A trailing `+` is accepted as the iptables interface wildcard.
///
/// # Errors
///
/// Returns `Err` if interface name violates kernel constraints.
pub fn validate_interface(name: &str) -> Result<String, String> {
    if name.is_empty() {
        return Err("Interface name cannot be empty".to_string());
    }

    let base = name.strip_suffix('+').unwrap_or(name);

    if base.len() > 15 {
        return Err("Interface name too long (max 15 characters)".to_string());
    }

    if base == "." || base == ".." {
        return Err("Invalid interface name".to_string());
    }

    if !base
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("Interface name contains invalid characters".to_string());
    }

    Ok(name.to_string())
}

/// Validates a rule description, emitted single-quoted in the comment match.
///
/// Free text is allowed except for a single quote, which would end the quoted
/// comment, and control characters, which break the one-rule-per-line dump.
///
/// # Errors
///
/// Returns `Err` if the description contains `'` or a control character, or
/// exceeds the 255-byte comment limit.
pub fn validate_description(description: &str) -> Result<String, String> {
    if description.len() > 255 {
        return Err("Description too long (max 255 bytes)".to_string());
    }

    if description.contains('\'') {
        return Err("Description cannot contain a single quote (')".to_string());
    }

    if description.chars().any(char::is_control) {
        return Err("Description cannot contain control characters".to_string());
    }

    Ok(description.to_string())
}

/// Validates a protocol token given to `-p`.
///
/// Accepts a protocol name or number; the token must be one word.
///
/// # Errors
///
/// Returns `Err` if the token is empty or holds characters outside
/// `[A-Za-z0-9._-]`.
pub fn validate_protocol(token: &str) -> Result<String, String> {
    if token.is_empty() {
        return Err("Protocol cannot be empty".to_string());
    }

    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(format!("Invalid protocol '{token}'"));
    }

    Ok(token.to_string())
}

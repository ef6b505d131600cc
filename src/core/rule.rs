//! Rule descriptor data structures
//!
//! A [`RuleDescriptor`] describes one logical direct rule: where it sits
//! (direction and position), what it matches (addresses, interfaces, protocol,
//! ports, connection state) and how it is labelled. The action is not part of
//! the descriptor; it is passed per invocation as an [`ActionKind`].
//!
//! Descriptors are usually read from a JSON document:
//!
//! ```
//! use fwrule::core::rule::{Direction, RuleDescriptor};
//!
//! let rule = RuleDescriptor::from_json(
//!     r#"{ "direction": "in", "protocol": "tcp", "port": [80, 443], "description": "web" }"#,
//! )
//! .unwrap();
//! assert_eq!(rule.direction, Some(Direction::In));
//! assert_eq!(rule.position, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::core::error::{Error, Result};

/// Source literal meaning "any address"; omitted from compiled rules.
pub const ANY_SOURCE: &str = "0.0.0.0/0";

/// Traffic direction, mapped onto a built-in chain
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Direction {
    In,
    Out,
    Pre,
    Post,
}

impl Direction {
    /// Chain the direction is evaluated in
    pub const fn chain(self) -> &'static str {
        match self {
            Direction::In => "INPUT",
            Direction::Out => "OUTPUT",
            Direction::Pre => "PREROUTING",
            Direction::Post => "POSTROUTING",
        }
    }

    /// Pre/post routing rules live in the nat table
    pub const fn is_nat(self) -> bool {
        matches!(self, Direction::Pre | Direction::Post)
    }
}

/// What a caller asks for: one of the five targets, logging, or removal
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ActionKind {
    Allow,
    Deny,
    Reject,
    Redirect,
    Masquerade,
    Log,
    Remove,
}

impl ActionKind {
    /// Targets swept by a removal, in the order they are tried.
    ///
    /// `Log` is not part of the sweep.
    pub const REMOVAL_SWEEP: [ActionKind; 5] = [
        ActionKind::Allow,
        ActionKind::Deny,
        ActionKind::Reject,
        ActionKind::Redirect,
        ActionKind::Masquerade,
    ];

    /// Jump target emitted for this action; `None` for `Remove`
    pub const fn target(self) -> Option<&'static str> {
        match self {
            ActionKind::Allow => Some("ACCEPT"),
            ActionKind::Deny => Some("DROP"),
            ActionKind::Reject => Some("REJECT"),
            ActionKind::Redirect => Some("REDIRECT"),
            ActionKind::Masquerade => Some("MASQUERADE"),
            ActionKind::Log => Some("LOG --log-prefix 'iptables: ' --log-level 7"),
            ActionKind::Remove => None,
        }
    }
}

/// Transport protocol token passed to `-p`
///
/// The common names get their own variant; anything else the engine accepts
/// (a number such as `47`, or a name like `ipv6-icmp`) is kept verbatim in
/// `Other`. Parsing is case-sensitive, so only the exact token `tcp` is
/// [`Protocol::Tcp`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Protocol {
    Tcp,
    Udp,
    Udplite,
    Icmp,
    Icmpv6,
    Sctp,
    Dccp,
    Esp,
    Ah,
    Gre,
    All,
    Other(String),
}

impl Protocol {
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Udplite => "udplite",
            Protocol::Icmp => "icmp",
            Protocol::Icmpv6 => "icmpv6",
            Protocol::Sctp => "sctp",
            Protocol::Dccp => "dccp",
            Protocol::Esp => "esp",
            Protocol::Ah => "ah",
            Protocol::Gre => "gre",
            Protocol::All => "all",
            Protocol::Other(token) => token,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        crate::validators::validate_protocol(s)?;
        Ok(match s {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            "udplite" => Protocol::Udplite,
            "icmp" => Protocol::Icmp,
            "icmpv6" => Protocol::Icmpv6,
            "sctp" => Protocol::Sctp,
            "dccp" => Protocol::Dccp,
            "esp" => Protocol::Esp,
            "ah" => Protocol::Ah,
            "gre" => Protocol::Gre,
            "all" => Protocol::All,
            other => Protocol::Other(other.to_string()),
        })
    }
}

impl TryFrom<String> for Protocol {
    type Error = String;

    fn try_from(token: String) -> std::result::Result<Self, Self::Error> {
        token.parse()
    }
}

impl From<Protocol> for String {
    fn from(protocol: Protocol) -> Self {
        protocol.as_str().to_string()
    }
}

/// Connection tracking state
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ConnState {
    New,
    Established,
    Related,
    Invalid,
    Untracked,
    Snat,
    Dnat,
}

/// Single port or inclusive range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortEntry {
    Single(u16),
    Range { start: u16, end: u16 },
}

impl PortEntry {
    pub const fn start(self) -> u16 {
        match self {
            PortEntry::Single(p) | PortEntry::Range { start: p, .. } => p,
        }
    }

    pub const fn end(self) -> u16 {
        match self {
            PortEntry::Single(p) | PortEntry::Range { end: p, .. } => p,
        }
    }
}

impl fmt::Display for PortEntry {
    /// Multiport syntax: `22` or `1000:2000`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortEntry::Single(p) => write!(f, "{p}"),
            PortEntry::Range { start, end } => write!(f, "{start}:{end}"),
        }
    }
}

impl FromStr for PortEntry {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |p: &str| {
            p.trim()
                .parse::<u16>()
                .map_err(|_| format!("invalid port '{p}'"))
        };
        match s.split_once([':', '-']) {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start == end {
                    Ok(PortEntry::Single(start))
                } else {
                    Ok(PortEntry::Range { start, end })
                }
            }
            None => parse(s).map(PortEntry::Single),
        }
    }
}

/// Raw shapes accepted for port fields: `22`, `"80,443"`, `"1000:2000"`, `[22, "8000-8080"]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortInput {
    Number(u16),
    Text(String),
    List(Vec<PortInput>),
}

/// Port specification for one multiport clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PortInput", into = "String")]
pub struct PortSpec(Vec<PortEntry>);

impl PortSpec {
    pub fn new(entries: Vec<PortEntry>) -> Self {
        Self(entries)
    }

    pub fn single(port: u16) -> Self {
        Self(vec![PortEntry::Single(port)])
    }

    pub fn entries(&self) -> &[PortEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn collect(input: PortInput, out: &mut Vec<PortEntry>) -> std::result::Result<(), String> {
        match input {
            PortInput::Number(p) => out.push(PortEntry::Single(p)),
            PortInput::Text(text) => {
                for part in text.split(',').filter(|p| !p.trim().is_empty()) {
                    out.push(part.parse()?);
                }
            }
            PortInput::List(items) => {
                for item in items {
                    Self::collect(item, out)?;
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<PortInput> for PortSpec {
    type Error = String;

    fn try_from(input: PortInput) -> std::result::Result<Self, Self::Error> {
        let mut entries = Vec::new();
        Self::collect(input, &mut entries)?;
        Ok(Self(entries))
    }
}

impl FromStr for PortSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::try_from(PortInput::Text(s.to_string()))
    }
}

impl fmt::Display for PortSpec {
    /// Entries sorted ascending and comma-joined, independent of input order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted = self.0.clone();
        sorted.sort_unstable_by_key(|e| (e.start(), e.end()));
        let mut first = true;
        for entry in sorted {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{entry}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<PortSpec> for String {
    fn from(spec: PortSpec) -> Self {
        spec.to_string()
    }
}

/// Raw shapes accepted for `stateful`: `"new"`, `"NEW,ESTABLISHED"`, `["new", "related"]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StateInput {
    One(String),
    Many(Vec<String>),
}

/// One or more connection states, kept in caller order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StateInput")]
pub struct StateSpec(Vec<ConnState>);

impl StateSpec {
    pub fn new(states: Vec<ConnState>) -> Self {
        Self(states)
    }

    pub fn states(&self) -> &[ConnState] {
        &self.0
    }
}

impl TryFrom<StateInput> for StateSpec {
    type Error = String;

    fn try_from(input: StateInput) -> std::result::Result<Self, Self::Error> {
        let tokens = match input {
            StateInput::One(s) => s.split(',').map(str::to_string).collect(),
            StateInput::Many(v) => v,
        };
        tokens
            .iter()
            .map(|t| {
                t.trim()
                    .parse::<ConnState>()
                    .map_err(|_| format!("unknown connection state '{}'", t.trim()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for StateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

fn default_position() -> u32 {
    1
}

/// Declarative description of one direct rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuleDescriptor {
    /// Resource name, used only in log lines
    #[serde(default)]
    pub name: String,
    /// Chain selector; `None` means FORWARD in the filter table
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default = "default_position")]
    pub position: u32,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub dest_interface: Option<String>,
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub source_port: Option<PortSpec>,
    /// Wins over `port` when both are set
    #[serde(default)]
    pub dest_port: Option<PortSpec>,
    #[serde(default)]
    pub port: Option<PortSpec>,
    #[serde(default)]
    pub stateful: Option<StateSpec>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub redirect_port: Option<u16>,
    /// Verbatim rule text; bypasses every structured field
    #[serde(default)]
    pub raw: Option<String>,
}

impl Default for RuleDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            direction: None,
            position: default_position(),
            source: None,
            destination: None,
            interface: None,
            dest_interface: None,
            protocol: None,
            source_port: None,
            dest_port: None,
            port: None,
            stateful: None,
            description: None,
            redirect_port: None,
            raw: None,
        }
    }
}

impl RuleDescriptor {
    /// Parses and validates a descriptor document
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Reads a descriptor document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Destination ports, falling back to `port`
    pub fn dest_ports(&self) -> Option<&PortSpec> {
        self.dest_port.as_ref().or(self.port.as_ref())
    }

    /// Source as emitted in the rule; blank and the "any" literal count as unset
    pub fn effective_source(&self) -> Option<&str> {
        self.source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != ANY_SOURCE)
    }

    /// Destination as emitted in the rule; blank counts as unset
    pub fn effective_destination(&self) -> Option<&str> {
        self.destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Label used in log lines
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.description.as_deref().unwrap_or("unnamed")
        } else {
            &self.name
        }
    }

    /// Checks the structured fields without rewriting any of them.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        use crate::validators::{
            validate_description, validate_interface, validate_port_spec, validate_position,
        };

        let invalid = |field: &str, message: String| Error::Validation {
            field: field.to_string(),
            message,
        };

        validate_position(self.position).map_err(|m| invalid("position", m))?;

        for (field, value) in [
            ("interface", &self.interface),
            ("dest_interface", &self.dest_interface),
        ] {
            if let Some(name) = value {
                validate_interface(name).map_err(|m| invalid(field, m))?;
            }
        }

        for (field, value) in [
            ("source_port", &self.source_port),
            ("dest_port", &self.dest_port),
            ("port", &self.port),
        ] {
            if let Some(spec) = value {
                validate_port_spec(spec).map_err(|m| invalid(field, m))?;
            }
        }

        if let Some(description) = &self.description {
            validate_description(description).map_err(|m| invalid("description", m))?;
        }

        if self.redirect_port == Some(0) {
            return Err(invalid(
                "redirect_port",
                "Port must be between 1 and 65535".to_string(),
            ));
        }

        if self.raw.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(invalid("raw", "Raw rule cannot be blank".to_string()));
        }

        Ok(())
    }
}

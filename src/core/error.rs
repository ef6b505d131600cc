use thiserror::Error;

/// Core error types for fwrule
#[derive(Debug, Error)]
pub enum Error {
    /// An address field is set but is not an IP literal or CIDR
    #[error("Invalid {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    /// A required parameter is missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// firewall-cmd returned a non-zero status for a mutation
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// The direct-rule dump could not be retrieved
    #[error("Rule query failed: {0}")]
    QueryFailed(String),

    /// Descriptor validation failed
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Privilege escalation failed
    #[error("Elevation error: {0}")]
    Elevation(#[from] crate::elevation::ElevationError),

    /// Match pattern could not be built from a rule
    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Stderr captured from a failed firewall-cmd invocation, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::CommandFailed { stderr, .. } if !stderr.is_empty() => Some(stderr.as_str()),
            _ => None,
        }
    }
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Database of firewall-cmd error patterns and their translations
pub struct FirewalldErrorPattern;

impl FirewalldErrorPattern {
    /// Matches an error message against known patterns and returns a user-friendly translation.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();

        if lower.contains("firewalld is not running") || lower.contains("not_running") {
            return ErrorTranslation::new("The firewalld daemon is not running")
                .with_suggestion("Start it: sudo systemctl start firewalld")
                .with_suggestion("Check its state: firewall-cmd --state");
        }

        if lower.contains("authorization failed")
            || lower.contains("not authorized")
            || lower.contains("permission denied")
            || lower.contains("access_denied")
        {
            return ErrorTranslation::new("Insufficient permissions to modify direct rules")
                .with_suggestion("Run as root, or set FWRULE_ELEVATION_METHOD=sudo")
                .with_suggestion("Ensure a polkit agent is running when using pkexec");
        }

        if lower.contains("no such file") || lower.contains("command not found") {
            return ErrorTranslation::new("firewall-cmd is not installed or not found in PATH")
                .with_suggestion("Install firewalld: sudo dnf install firewalld  (Fedora/RHEL)")
                .with_suggestion("Or: sudo apt install firewalld  (Debian/Ubuntu)")
                .with_suggestion("Or point FWRULE_FIREWALL_CMD at the binary");
        }

        if lower.contains("already_enabled") {
            return ErrorTranslation::new("The rule is already installed")
                .with_suggestion("The engine reported a duplicate the existence check missed")
                .with_suggestion("Compare with: firewall-cmd --direct --get-all-rules");
        }

        if lower.contains("not_enabled") {
            return ErrorTranslation::new("The rule is not installed")
                .with_suggestion("It may have been removed by another caller")
                .with_suggestion("Compare with: firewall-cmd --direct --get-all-rules");
        }

        if lower.contains("invalid_ipv")
            || lower.contains("invalid_rule")
            || lower.contains("invalid_argument")
            || lower.contains("command_failed")
        {
            return ErrorTranslation::new("The engine rejected the rule")
                .with_suggestion("Check chain, protocol and port combinations")
                .with_suggestion("NAT directions (pre/post) only accept NAT targets")
                .with_suggestion("Preview the rule with: fwrule preview <action> <rule.json>");
        }

        if lower.contains("timeout") || lower.contains("timed out") {
            return ErrorTranslation::new("Operation timed out")
                .with_suggestion("firewalld may be busy reloading")
                .with_suggestion("Try again when the system is less busy");
        }

        ErrorTranslation::new(format!("Firewall error: {msg}"))
            .with_suggestion("Check the detailed error message for more information")
            .with_suggestion("Verify firewalld is working: firewall-cmd --state")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

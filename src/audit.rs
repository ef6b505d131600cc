/// Audit logging for direct-rule mutations
///
/// Every rule fwrule adds or removes is appended to a JSON-lines file so
/// operators can reconstruct what changed and when.
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::manager::ConvergeReport;

/// Types of auditable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AddRule,
    RemoveRule,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Type of event
    pub event_type: EventType,

    /// Whether the operation succeeded
    pub success: bool,

    /// Additional structured data about the event
    pub details: serde_json::Value,

    /// Error message if operation failed
    pub error: Option<String>,
}

impl AuditEvent {
    /// Creates a new audit event
    pub fn new(
        event_type: EventType,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            success,
            details,
            error,
        }
    }
}

/// Audit log writer
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Opens the audit log in the state directory
    ///
    /// # Errors
    ///
    /// Returns `Err` if state directory cannot be determined or created
    pub fn new() -> std::io::Result<Self> {
        let dir = crate::utils::ensure_state_dir()?.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "State directory not found")
        })?;
        Ok(Self::at(dir.join("audit.log")))
    }

    /// Audit log at an explicit path
    pub fn at(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    /// Appends an event to the audit log
    ///
    /// Events are written as JSON-lines format (one JSON object per line)
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be opened or written
    pub fn log(&self, event: &AuditEvent) -> std::io::Result<()> {
        let json = serde_json::to_string(event)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;

        Ok(())
    }

    /// Reads the most recent events from the log, newest first
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be read
    pub fn read_recent(&self, count: usize) -> std::io::Result<Vec<AuditEvent>> {
        let content = std::fs::read_to_string(&self.log_path)?;

        Ok(content
            .lines()
            .rev()
            .take(count)
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Records every mutation in a report
    ///
    /// # Errors
    ///
    /// Returns the first write failure
    pub fn log_report(&self, rule_name: &str, report: &ConvergeReport) -> std::io::Result<()> {
        let events = report
            .added
            .iter()
            .map(|rule| (EventType::AddRule, rule))
            .chain(report.removed.iter().map(|rule| (EventType::RemoveRule, rule)));

        for (event_type, rule) in events {
            let event = AuditEvent::new(
                event_type,
                true,
                serde_json::json!({ "name": rule_name, "rule": rule }),
                None,
            );
            self.log(&event)?;
        }
        Ok(())
    }
}

/// Records a whole apply or remove: every mutation in `report`, then the
/// error if the call failed part way through.
///
/// Write failures only log a warning.
pub fn log_converge(
    audit: &AuditLog,
    event_type: EventType,
    rule_name: &str,
    report: &ConvergeReport,
    outcome: &crate::Result<()>,
) {
    if let Err(e) = audit.log_report(rule_name, report) {
        tracing::warn!("Failed to write audit log: {}", e);
    }
    if let Err(e) = outcome {
        log_failure(audit, event_type, rule_name, &e.to_string());
    }
}

/// Logs a failed apply or remove
pub fn log_failure(audit: &AuditLog, event_type: EventType, rule_name: &str, error: &str) {
    let event = AuditEvent::new(
        event_type,
        false,
        serde_json::json!({ "name": rule_name }),
        Some(error.to_string()),
    );

    if let Err(e) = audit.log(&event) {
        tracing::warn!("Failed to write audit log: {}", e);
    }
}

use crate::core::store::DEFAULT_FIREWALL_CMD;
use crate::utils::get_config_dir;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Overrides `firewall_cmd` from the config file
pub const FIREWALL_CMD_ENV: &str = "FWRULE_FIREWALL_CMD";

/// Application configuration, read from `config.json` in the config directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine binary; only this program is ever executed
    #[serde(default = "default_firewall_cmd")]
    pub firewall_cmd: String,
    /// Append every add/remove to the audit log
    #[serde(default = "default_true")]
    pub audit_log: bool,
    /// Write tracing output to the state directory instead of stderr
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            firewall_cmd: default_firewall_cmd(),
            audit_log: true,
            log_to_file: false,
        }
    }
}

fn default_firewall_cmd() -> String {
    DEFAULT_FIREWALL_CMD.to_string()
}

fn default_true() -> bool {
    true
}

/// Loads a config file, or returns defaults if it is missing or malformed.
pub fn load_config_from(path: &Path) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed config {}: {e}", path.display());
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// Loads the user config and applies environment overrides.
pub fn load_config() -> AppConfig {
    let mut config = get_config_dir()
        .map(|dir| load_config_from(&dir.join("config.json")))
        .unwrap_or_default();

    if let Ok(binary) = std::env::var(FIREWALL_CMD_ENV)
        && !binary.trim().is_empty()
    {
        config.firewall_cmd = binary.trim().to_string();
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.firewall_cmd, "firewall-cmd");
        assert!(config.audit_log);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "log_to_file": true }"#).unwrap();

        let config = load_config_from(&path);
        assert!(config.log_to_file);
        assert!(config.audit_log);
        assert_eq!(config.firewall_cmd, "firewall-cmd");
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config_from(&path), AppConfig::default());
    }

    #[test]
    fn test_env_overrides_binary() {
        let _guard = crate::core::test_helpers::ENV_VAR_MUTEX.lock().unwrap();
        unsafe {
            std::env::set_var(FIREWALL_CMD_ENV, "/opt/firewalld/bin/firewall-cmd");
        }
        let config = load_config();
        unsafe {
            std::env::remove_var(FIREWALL_CMD_ENV);
        }
        assert_eq!(config.firewall_cmd, "/opt/firewalld/bin/firewall-cmd");
    }
}

//! User settings for splitledger
//!
//! Stored as `config.json` in the base directory. A missing file means
//! defaults; unknown keys are rejected so typos surface early.

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::models::DEFAULT_CURRENCY;
use crate::storage::file_io::write_json_atomic;

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency written into newly created stores
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Tracing filter used when no environment override is set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Append ledger events to the audit log
    #[serde(default = "default_true")]
    pub audit_enabled: bool,

    /// Number of store backups to keep
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    /// Take a backup before every balance rebuild
    #[serde(default = "default_true")]
    pub backup_on_rebuild: bool,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

fn default_backup_retention() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_currency: default_currency(),
            log_level: default_log_level(),
            audit_enabled: true,
            backup_retention: default_backup_retention(),
            backup_on_rebuild: true,
        }
    }
}

impl Settings {
    /// Load settings from disk, or defaults if the file doesn't exist
    pub fn load_or_default(paths: &LedgerPaths) -> LedgerResult<Self> {
        let settings_path = paths.settings_file();
        if !settings_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| LedgerError::io("Failed to read settings file", e))?;
        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| LedgerError::Config(format!("Failed to parse settings file: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &LedgerPaths) -> LedgerResult<()> {
        self.validate()?;
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> LedgerResult<()> {
        if self.default_currency.trim().is_empty() {
            return Err(LedgerError::Config("default_currency cannot be empty".into()));
        }
        if self.backup_retention == 0 {
            return Err(LedgerError::Config(
                "backup_retention must keep at least one backup".into(),
            ));
        }
        Ok(())
    }

    /// Set a single setting from its key and textual value
    pub fn set(&mut self, key: &str, value: &str) -> LedgerResult<()> {
        let parse_bool = |v: &str| {
            v.parse::<bool>()
                .map_err(|_| LedgerError::Config(format!("{} expects true or false", key)))
        };

        match key {
            "default_currency" => self.default_currency = value.trim().to_uppercase(),
            "log_level" => self.log_level = value.trim().to_string(),
            "audit_enabled" => self.audit_enabled = parse_bool(value)?,
            "backup_on_rebuild" => self.backup_on_rebuild = parse_bool(value)?,
            "backup_retention" => {
                self.backup_retention = value.parse().map_err(|_| {
                    LedgerError::Config("backup_retention expects a whole number".into())
                })?
            }
            other => return Err(LedgerError::Config(format!("Unknown setting: {}", other))),
        }
        self.validate()
    }
}

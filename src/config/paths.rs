//! Path management for splitledger
//!
//! ## Path Resolution Order
//!
//! 1. `SPLITLEDGER_DATA_DIR` environment variable (if set)
//! 2. The platform config directory from `directories`
//!    (`~/.config/splitledger` on Linux, `%APPDATA%\splitledger` on Windows)
//!
//! The store file itself can be moved anywhere with `--store`; the other
//! files always live under the base directory.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{LedgerError, LedgerResult};

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "SPLITLEDGER_DATA_DIR";

/// Manages all paths used by splitledger
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    base_dir: PathBuf,
    store_override: Option<PathBuf>,
}

impl LedgerPaths {
    /// Resolve the base directory from the environment or the platform
    pub fn new() -> LedgerResult<Self> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => ProjectDirs::from("", "", "splitledger")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    LedgerError::Config("Could not determine a home directory".into())
                })?,
        };

        Ok(Self::with_base_dir(base_dir))
    }

    /// Use an explicit base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            store_override: None,
        }
    }

    /// Point the store at a specific file
    pub fn with_store_file(mut self, store: Option<PathBuf>) -> Self {
        self.store_override = store;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The ledger document
    pub fn store_file(&self) -> PathBuf {
        self.store_override
            .clone()
            .unwrap_or_else(|| self.base_dir.join("store.json"))
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Create the base and backup directories
    pub fn ensure_directories(&self) -> LedgerResult<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| LedgerError::io("Failed to create base directory", e))?;
        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| LedgerError::io("Failed to create backup directory", e))?;
        Ok(())
    }
}

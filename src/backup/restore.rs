//! Backup restoration for splitledger
//!
//! A backup is only written back after its document parses as a store and
//! passes the same integrity checks as a normal load.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::paths::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::models::Store;
use crate::services::ledger::replay_balances;
use crate::storage::file_io::{read_json_required, write_json_atomic};

use super::manager::{BackupArchive, ARCHIVE_VERSION};

/// Validates backups and writes them back over the store
pub struct RestoreManager {
    store_file: PathBuf,
}

/// What a backup contains
#[derive(Debug)]
pub struct ValidationResult {
    pub backup_date: DateTime<Utc>,
    pub users: usize,
    pub groups: usize,
    pub transactions: usize,
    pub payments: usize,
    /// Pairs whose stored balance differs from a replay of the history
    pub drifting_pairs: usize,
}

impl ValidationResult {
    /// Whether the archived balances match the archived history
    pub fn is_consistent(&self) -> bool {
        self.drifting_pairs == 0
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Backup from {}: {} users, {} groups, {} transactions, {} payments",
            self.backup_date.format("%Y-%m-%d %H:%M:%S UTC"),
            self.users,
            self.groups,
            self.transactions,
            self.payments
        );
        if !self.is_consistent() {
            summary.push_str(&format!(
                " ({} balance pairs need a rebuild)",
                self.drifting_pairs
            ));
        }
        summary
    }
}

impl RestoreManager {
    pub fn new(paths: &LedgerPaths) -> Self {
        Self {
            store_file: paths.store_file(),
        }
    }

    fn load_archive(backup_path: &Path) -> LedgerResult<(BackupArchive, Store)> {
        let archive: BackupArchive = read_json_required(backup_path)?;
        if archive.schema_version != ARCHIVE_VERSION {
            return Err(LedgerError::Backup(format!(
                "Unsupported backup format version {}",
                archive.schema_version
            )));
        }

        let store: Store = serde_json::from_value(archive.store.clone())
            .map_err(|e| LedgerError::Backup(format!("Backup holds an invalid store: {}", e)))?;
        store.check_integrity().map_err(|reason| {
            LedgerError::Backup(format!("Backup holds an invalid store: {}", reason))
        })?;

        Ok((archive, store))
    }

    /// Check a backup without touching the current store
    pub fn validate_backup(&self, backup_path: &Path) -> LedgerResult<ValidationResult> {
        let (archive, store) = Self::load_archive(backup_path)?;
        let expected = replay_balances(&store, Utc::now())?;

        Ok(ValidationResult {
            backup_date: archive.created_at,
            users: store.users.len(),
            groups: store.groups.len(),
            transactions: store.transactions.len(),
            payments: store.payments.len(),
            drifting_pairs: store.balances.drift_from(&expected).len(),
        })
    }

    /// Replace the current store with the backup's document
    pub fn restore_from_file(&self, backup_path: &Path) -> LedgerResult<ValidationResult> {
        let validation = self.validate_backup(backup_path)?;
        let (_, store) = Self::load_archive(backup_path)?;
        write_json_atomic(&self.store_file, &store)?;

        info!(
            backup = %backup_path.display(),
            store = %self.store_file.display(),
            "Restored store from backup"
        );
        Ok(validation)
    }
}

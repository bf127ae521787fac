//! Backup manager for splitledger
//!
//! Copies the ledger document into timestamped JSON archives and keeps only
//! the newest few.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::paths::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::file_io::{read_json_required, write_json_atomic};

/// Archive format version
pub const ARCHIVE_VERSION: u32 = 1;

/// Metadata about a backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub filename: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Backup archive format
///
/// The document is kept as raw JSON so that a store which no longer passes
/// validation can still be archived.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackupArchive {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    /// Path of the store the archive was taken from
    pub source: PathBuf,
    pub store: serde_json::Value,
}

/// Creates backups and enforces the retention count
pub struct BackupManager {
    backup_dir: PathBuf,
    store_file: PathBuf,
    retention: usize,
}

impl BackupManager {
    pub fn new(paths: &LedgerPaths, retention: usize) -> Self {
        Self {
            backup_dir: paths.backup_dir(),
            store_file: paths.store_file(),
            retention,
        }
    }

    /// Archive the current store; returns the path of the new backup
    pub fn create_backup(&self) -> LedgerResult<PathBuf> {
        if !self.store_file.exists() {
            return Err(LedgerError::Backup(format!(
                "No store to back up at {}",
                self.store_file.display()
            )));
        }

        let now = Utc::now();
        let filename = format!(
            "backup-{}-{:03}.json",
            now.format("%Y%m%d-%H%M%S"),
            now.timestamp_subsec_millis()
        );
        let backup_path = self.backup_dir.join(&filename);

        let store: serde_json::Value = read_json_required(&self.store_file)?;
        let archive = BackupArchive {
            schema_version: ARCHIVE_VERSION,
            created_at: now,
            source: self.store_file.clone(),
            store,
        };
        write_json_atomic(&backup_path, &archive)?;

        info!(path = %backup_path.display(), "Created backup");
        Ok(backup_path)
    }

    /// All backups, newest first
    pub fn list_backups(&self) -> LedgerResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.backup_dir)
            .map_err(|e| LedgerError::io("Failed to read backup directory", e))?;

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LedgerError::io("Failed to read directory entry", e))?;
            if let Some(info) = parse_backup_info(&entry.path()) {
                backups.push(info);
            }
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Delete everything beyond the newest `retention` backups
    pub fn enforce_retention(&self) -> LedgerResult<Vec<PathBuf>> {
        let mut deleted = Vec::new();
        for backup in self.list_backups()?.into_iter().skip(self.retention) {
            fs::remove_file(&backup.path)
                .map_err(|e| LedgerError::io("Failed to delete old backup", e))?;
            debug!(path = %backup.path.display(), "Deleted old backup");
            deleted.push(backup.path);
        }
        Ok(deleted)
    }

    /// Create a backup and then enforce retention
    pub fn create_backup_with_retention(&self) -> LedgerResult<(PathBuf, Vec<PathBuf>)> {
        let backup_path = self.create_backup()?;
        let deleted = self.enforce_retention()?;
        Ok((backup_path, deleted))
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Find a backup by file name
    pub fn get_backup(&self, filename: &str) -> Option<BackupInfo> {
        parse_backup_info(&self.backup_dir.join(filename))
    }

    pub fn get_latest_backup(&self) -> LedgerResult<Option<BackupInfo>> {
        Ok(self.list_backups()?.into_iter().next())
    }
}

fn parse_backup_info(path: &Path) -> Option<BackupInfo> {
    let filename = path.file_name()?.to_str()?.to_string();
    let stamp = filename.strip_prefix("backup-")?.strip_suffix(".json")?;
    let created_at = parse_backup_timestamp(stamp)?;
    let size_bytes = fs::metadata(path).ok()?.len();

    Some(BackupInfo {
        filename,
        path: path.to_path_buf(),
        created_at,
        size_bytes,
    })
}

/// Parse `YYYYMMDD-HHMMSS` with an optional `-mmm` milliseconds suffix
fn parse_backup_timestamp(stamp: &str) -> Option<DateTime<Utc>> {
    let (base, millis) = match stamp.len() {
        15 => (stamp, 0),
        19 => {
            let (base, millis) = stamp.split_at(15);
            (base, millis.strip_prefix('-')?.parse::<i64>().ok()?)
        }
        _ => return None,
    };

    let naive = NaiveDateTime::parse_from_str(base, "%Y%m%d-%H%M%S").ok()?;
    Some(naive.and_utc() + Duration::milliseconds(millis))
}

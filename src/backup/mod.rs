//! Backup system for splitledger
//!
//! - `BackupManager`: archives the store and enforces the retention count
//! - `RestoreManager`: validates archives and writes them back
//!
//! # Backup Format
//!
//! Each backup is a JSON file named `backup-YYYYMMDD-HHMMSS-mmm.json` with:
//! - `schema_version`: archive format version
//! - `created_at`: when the backup was taken
//! - `source`: path of the store it was taken from
//! - `store`: the full ledger document
//!
//! # Example
//!
//! ```rust,ignore
//! use splitledger::backup::{BackupManager, RestoreManager};
//!
//! let manager = BackupManager::new(&paths, settings.backup_retention);
//! let (backup_path, _deleted) = manager.create_backup_with_retention()?;
//!
//! let restore = RestoreManager::new(&paths);
//! println!("{}", restore.restore_from_file(&backup_path)?.summary());
//! ```

mod manager;
mod restore;

pub use manager::{BackupArchive, BackupInfo, BackupManager};
pub use restore::{RestoreManager, ValidationResult};

//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use std::path::PathBuf;

use clap::Subcommand;

use crate::backup::{BackupManager, RestoreManager};
use crate::config::{LedgerPaths, Settings};
use crate::error::{LedgerError, LedgerResult};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create,

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Overwrite the current ledger without asking
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &LedgerPaths,
    settings: &Settings,
    cmd: BackupCommands,
) -> LedgerResult<()> {
    let manager = BackupManager::new(paths, settings.backup_retention);

    match cmd {
        BackupCommands::Create => {
            let (backup_path, deleted) = manager.create_backup_with_retention()?;
            println!("Backup created: {}", display_name(&backup_path));
            println!("Location: {}", backup_path.display());
            if !deleted.is_empty() {
                println!("Removed {} old backup(s).", deleted.len());
            }
        }

        BackupCommands::List { verbose } => {
            let backups = manager.list_backups()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: splitledger backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                let age =
                    format_duration(chrono::Utc::now().signed_duration_since(backup.created_at));

                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Size: {}\n   Age: {}\n",
                        i + 1,
                        backup.filename,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        format_size(backup.size_bytes),
                        age,
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {})",
                        i + 1,
                        backup.filename,
                        age,
                        format_size(backup.size_bytes),
                    );
                }
            }

            println!();
            println!(
                "Total: {} backup(s), keeping {}",
                backups.len(),
                settings.backup_retention
            );
        }

        BackupCommands::Restore { backup, force } => {
            let backup_path = resolve_backup_path(&manager, &backup)?;

            let restore_manager = RestoreManager::new(paths);
            let validation = restore_manager.validate_backup(&backup_path)?;

            println!("Backup Information");
            println!("==================");
            println!("File: {}", backup_path.display());
            println!("Status: {}", validation.summary());
            println!();

            if !force {
                println!("WARNING: This will overwrite the current ledger!");
                println!("To proceed, run again with --force flag:");
                println!("  splitledger backup restore {} --force", backup);
                return Ok(());
            }

            if paths.store_file().exists() {
                let pre_restore = manager.create_backup()?;
                println!("Pre-restore backup saved: {}", display_name(&pre_restore));
            }

            restore_manager.restore_from_file(&backup_path)?;
            println!("Restore complete!");
            if !validation.is_consistent() {
                println!("Balances in this backup are out of date; run 'splitledger rebuild'.");
            }
        }
    }

    Ok(())
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Resolve a backup identifier to a full path
fn resolve_backup_path(manager: &BackupManager, backup: &str) -> LedgerResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .get_latest_backup()?
            .map(|b| b.path)
            .ok_or_else(|| LedgerError::Backup("No backups found".into()));
    }

    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    if let Some(info) = manager.get_backup(backup) {
        return Ok(info.path);
    }
    if let Some(info) = manager.get_backup(&format!("{}.json", backup)) {
        return Ok(info.path);
    }

    Err(LedgerError::Backup(format!("Backup not found: {}", backup)))
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    format!("{}d", hours / 24)
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

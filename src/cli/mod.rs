//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod audit;
pub mod backup;
pub mod balances;
pub mod expense;
pub mod export;
pub mod group;
pub mod user;

pub use audit::handle_audit_command;
pub use backup::{handle_backup_command, BackupCommands};
pub use balances::{
    handle_balances_command, handle_history_command, handle_rebuild_command,
    handle_verify_command, BalancesArgs,
};
pub use expense::{
    handle_bill_command, handle_expense_command, handle_pay_command, BillArgs, ExpenseCommands,
    PayArgs,
};
pub use export::{handle_export_command, ExportCommands};
pub use group::{handle_group_command, GroupCommands};
pub use user::{handle_user_command, UserCommands};

use crate::audit::AuditLogger;
use crate::config::{LedgerPaths, Settings};
use crate::storage::JsonStoreRepository;

/// Repository for the configured store file
pub(crate) fn open_repository(paths: &LedgerPaths) -> JsonStoreRepository {
    JsonStoreRepository::new(paths.store_file())
}

/// Audit logger, if auditing is enabled
pub(crate) fn audit_logger(paths: &LedgerPaths, settings: &Settings) -> Option<AuditLogger> {
    settings
        .audit_enabled
        .then(|| AuditLogger::new(paths.audit_log()))
}

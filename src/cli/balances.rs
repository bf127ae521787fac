//! Balance CLI commands: balances, history, rebuild, verify

use std::path::PathBuf;

use clap::Args;

use crate::backup::BackupManager;
use crate::config::{LedgerPaths, Settings};
use crate::display::{
    format_balance_edges, format_drift, format_history, format_positions, format_reconciliation,
};
use crate::error::{LedgerError, LedgerResult};
use crate::services::reconciliation::parse_reported;
use crate::services::registry::{resolve_group, resolve_user};
use crate::services::{reconcile, LedgerService};
use crate::storage::StoreRepository;

use super::{audit_logger, open_repository};

/// Show who owes whom
#[derive(Args)]
pub struct BalancesArgs {
    /// Group name or ID (omit for balances across all groups)
    pub group: Option<String>,

    /// Show balances across all groups
    #[arg(short, long, conflicts_with = "group")]
    pub global: bool,

    /// Show one user's position against everyone else
    #[arg(short, long, conflicts_with_all = ["group", "global"])]
    pub user: Option<String>,

    /// Compare against balances reported elsewhere (JSON edge list)
    #[arg(long, value_name = "FILE", conflicts_with = "user")]
    pub compare: Option<PathBuf>,
}

/// Handle the balances command
pub fn handle_balances_command(paths: &LedgerPaths, args: BalancesArgs) -> LedgerResult<()> {
    let repo = open_repository(paths);
    let service = LedgerService::new(&repo);
    let store = repo.load()?;

    if let Some(user) = args.user {
        let user_id = resolve_user(&store, &user)?;
        println!("Balances for {}", store.display_name(&user_id));
        println!("{}", format_positions(&store, &service.user_position(&user_id)?));
        return Ok(());
    }

    let edges = match &args.group {
        Some(group) => {
            let group_id = resolve_group(&store, group)?;
            let balances = service.get_group_balances(&group_id)?;
            let name = store.require_group(&group_id)?.name.clone();
            match balances.updated_at {
                Some(at) => println!(
                    "Balances for {} (as of {})",
                    name,
                    at.format("%Y-%m-%d %H:%M UTC")
                ),
                None => println!("Balances for {}", name),
            }
            balances.edges
        }
        None => {
            println!("Balances across all groups");
            service.global_balances()?
        }
    };
    println!("{}", format_balance_edges(&store, &edges));

    if let Some(file) = args.compare {
        let text = std::fs::read_to_string(&file).map_err(|e| {
            LedgerError::io(format!("Failed to read {}", file.display()), e)
        })?;
        let reported = parse_reported(&text)?;
        println!();
        let summary = reconcile(&edges, &reported)?;
        println!("{}", format_reconciliation(&store, &summary));
    }

    Ok(())
}

/// Handle the history command
pub fn handle_history_command(paths: &LedgerPaths, group: &str) -> LedgerResult<()> {
    let repo = open_repository(paths);
    let service = LedgerService::new(&repo);
    let store = repo.load()?;

    let group_id = resolve_group(&store, group)?;
    let (transactions, payments) = service.group_history(&group_id)?;
    println!("{}", format_history(&store, &transactions, &payments));
    Ok(())
}

/// Handle the rebuild command
pub fn handle_rebuild_command(paths: &LedgerPaths, settings: &Settings) -> LedgerResult<()> {
    let repo = open_repository(paths);
    if !repo.exists() {
        println!(
            "No ledger found at {}. Run 'splitledger init' first.",
            repo.path().display()
        );
        return Ok(());
    }

    if settings.backup_on_rebuild {
        let manager = BackupManager::new(paths, settings.backup_retention);
        let (backup, _) = manager.create_backup_with_retention()?;
        println!("Backup saved: {}", backup.display());
    }

    let audit = audit_logger(paths, settings);
    let mut service = LedgerService::new(&repo);
    if let Some(audit) = &audit {
        service = service.with_audit(audit);
    }
    let summary = service.rebuild_balances()?;

    println!("Replayed {} events.", summary.events_replayed);
    if summary.corrected.is_empty() {
        println!("Stored balances were already correct.");
    } else {
        println!("Corrected {} balance pairs:", summary.corrected.len());
        println!("{}", format_drift(&repo.load()?, &summary.corrected));
    }
    Ok(())
}

/// Handle the verify command
///
/// Fails when the stored balances differ from a replay of the history.
pub fn handle_verify_command(paths: &LedgerPaths) -> LedgerResult<()> {
    let repo = open_repository(paths);
    let service = LedgerService::new(&repo);
    let drift = service.verify_balances()?;

    println!("{}", format_drift(&repo.load()?, &drift));
    if drift.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::Validation(format!(
            "{} balance pairs differ from the history; run 'splitledger rebuild'",
            drift.len()
        )))
    }
}

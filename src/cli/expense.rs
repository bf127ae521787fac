//! Expense, bill and payment CLI commands
//!
//! Users and groups are given by name or ID and resolved against the store
//! before the event is recorded.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::audit::AuditLogger;
use crate::config::{LedgerPaths, Settings};
use crate::display::format_transaction_details;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Amount, Money, Store, UserId};
use crate::services::registry::{resolve_group, resolve_user};
use crate::services::{
    BillInput, CustomSplit, EqualSplit, LedgerService, PaymentRequest, ShareInput,
};
use crate::storage::{JsonStoreRepository, StoreRepository};

use super::{audit_logger, open_repository};

/// Expense subcommands
#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Split a bill evenly
    Equal {
        /// Group name or ID
        group: String,
        /// What the bill was for
        title: String,
        /// Total amount (e.g., "65.70" or "6570c")
        amount: String,
        /// Who paid
        #[arg(short, long)]
        paid_by: String,
        /// Participants (defaults to every group member)
        #[arg(short = 'w', long = "with", value_name = "USER")]
        participants: Vec<String>,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Split a bill with explicit shares
    Custom {
        /// Group name or ID
        group: String,
        /// What the bill was for
        title: String,
        /// Who paid
        #[arg(short, long)]
        paid_by: String,
        /// Shares as NAME=AMOUNT (repeatable)
        #[arg(short, long = "share", value_name = "NAME=AMOUNT", required = true)]
        shares: Vec<String>,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
    },
}

/// Record an itemized bill from a JSON file
#[derive(Args)]
pub struct BillArgs {
    /// Group name or ID
    pub group: String,
    /// Bill file: {"items": [{"item": "...", "cost": 12.5}], "assignments": {...}}
    pub file: PathBuf,
    /// Who paid
    #[arg(short, long)]
    pub paid_by: String,
    /// What the bill was for (defaults to the file name)
    #[arg(short, long)]
    pub title: Option<String>,
}

/// Record a payment between two users
#[derive(Args)]
pub struct PayArgs {
    /// Group name or ID
    pub group: String,
    /// Who paid
    pub from: String,
    /// Who received the money
    pub to: String,
    /// Amount (e.g., "12.50" or "1250c")
    pub amount: String,
    /// Free-form notes
    #[arg(short, long)]
    pub notes: Option<String>,
}

fn ledger_service<'a>(
    repo: &'a JsonStoreRepository,
    audit: Option<&'a AuditLogger>,
) -> LedgerService<'a, JsonStoreRepository> {
    let service = LedgerService::new(repo);
    match audit {
        Some(audit) => service.with_audit(audit),
        None => service,
    }
}

/// Parse a `NAME=AMOUNT` share argument
fn parse_share(store: &Store, arg: &str) -> LedgerResult<ShareInput> {
    let (name, amount) = arg.rsplit_once('=').ok_or_else(|| {
        LedgerError::Validation(format!("Share '{}' must look like NAME=AMOUNT", arg))
    })?;
    Ok(ShareInput::new(
        resolve_user(store, name.trim())?,
        Amount::parse(amount)?,
    ))
}

/// Handle an expense command
pub fn handle_expense_command(
    paths: &LedgerPaths,
    settings: &Settings,
    cmd: ExpenseCommands,
) -> LedgerResult<()> {
    let repo = open_repository(paths);
    let audit = audit_logger(paths, settings);
    let service = ledger_service(&repo, audit.as_ref());
    let store = repo.load()?;

    let txn = match cmd {
        ExpenseCommands::Equal {
            group,
            title,
            amount,
            paid_by,
            participants,
            notes,
        } => {
            let group_id = resolve_group(&store, &group)?;
            let payer = resolve_user(&store, &paid_by)?;
            let participant_ids = if participants.is_empty() {
                store.require_group(&group_id)?.member_ids.clone()
            } else {
                participants
                    .iter()
                    .map(|p| resolve_user(&store, p))
                    .collect::<LedgerResult<Vec<UserId>>>()?
            };

            let mut request = EqualSplit::new(
                group_id,
                title,
                Amount::parse(&amount)?,
                payer,
                participant_ids,
            );
            if let Some(notes) = notes {
                request = request.with_notes(notes);
            }
            service.record_equal_split(request)?
        }
        ExpenseCommands::Custom {
            group,
            title,
            paid_by,
            shares,
            notes,
        } => {
            let group_id = resolve_group(&store, &group)?;
            let payer = resolve_user(&store, &paid_by)?;
            let shares = shares
                .iter()
                .map(|s| parse_share(&store, s))
                .collect::<LedgerResult<Vec<_>>>()?;

            let mut request = CustomSplit::new(group_id, title, payer, shares);
            if let Some(notes) = notes {
                request = request.with_notes(notes);
            }
            service.record_custom_split(request)?
        }
    };

    println!("Recorded bill: {}", txn.title);
    println!();
    print!("{}", format_transaction_details(&repo.load()?, &txn));
    Ok(())
}

/// Handle the bill command
pub fn handle_bill_command(
    paths: &LedgerPaths,
    settings: &Settings,
    args: BillArgs,
) -> LedgerResult<()> {
    let text = std::fs::read_to_string(&args.file).map_err(|e| {
        LedgerError::io(format!("Failed to read bill file {}", args.file.display()), e)
    })?;
    let bill = BillInput::from_json(&text)?;

    let repo = open_repository(paths);
    let audit = audit_logger(paths, settings);
    let service = ledger_service(&repo, audit.as_ref());
    let store = repo.load()?;

    let group_id = resolve_group(&store, &args.group)?;
    let payer = resolve_user(&store, &args.paid_by)?;
    let title = args.title.unwrap_or_else(|| {
        args.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Bill".to_string())
    });

    let txn = service.record_bill(&group_id, &title, &payer, &bill)?;
    println!("Recorded bill: {}", txn.title);
    println!();
    print!("{}", format_transaction_details(&repo.load()?, &txn));
    Ok(())
}

/// Handle the pay command
pub fn handle_pay_command(
    paths: &LedgerPaths,
    settings: &Settings,
    args: PayArgs,
) -> LedgerResult<()> {
    let repo = open_repository(paths);
    let audit = audit_logger(paths, settings);
    let service = ledger_service(&repo, audit.as_ref());
    let store = repo.load()?;

    let group_id = resolve_group(&store, &args.group)?;
    let from = resolve_user(&store, &args.from)?;
    let to = resolve_user(&store, &args.to)?;

    let mut request = PaymentRequest::new(group_id, from, to, Amount::parse(&args.amount)?);
    if let Some(notes) = args.notes {
        request = request.with_notes(notes);
    }
    let payment = service.record_payment(request)?;

    println!(
        "Recorded payment: {} paid {} {}",
        args.from,
        args.to,
        Money::from_cents(payment.amount_cents).format_with_code(&payment.currency)
    );
    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use splitledger::cli::{
    handle_audit_command, handle_backup_command, handle_balances_command, handle_bill_command,
    handle_expense_command, handle_export_command, handle_group_command, handle_history_command,
    handle_pay_command, handle_rebuild_command, handle_user_command, handle_verify_command,
};
use splitledger::config::{LedgerPaths, Settings};
use splitledger::storage::JsonStoreRepository;

/// Environment variable with a tracing filter for this binary
const LOG_ENV: &str = "SPLITLEDGER_LOG";

#[derive(Parser)]
#[command(
    name = "splitledger",
    version,
    about = "Shared expense ledger with netted balances",
    long_about = "splitledger records shared bills and payments inside groups and keeps \
                  track of who owes whom, netting opposing debts so that every pair of \
                  people has at most one outstanding balance."
)]
struct Cli {
    /// Ledger file to use instead of the one in the data directory
    #[arg(long, global = true, env = "SPLITLEDGER_STORE", value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ledger file and settings if they don't exist
    Init,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// User management commands
    #[command(subcommand)]
    User(splitledger::cli::UserCommands),

    /// Group management commands
    #[command(subcommand)]
    Group(splitledger::cli::GroupCommands),

    /// Record a shared expense
    #[command(subcommand)]
    Expense(splitledger::cli::ExpenseCommands),

    /// Record an itemized bill from a JSON file
    Bill(splitledger::cli::BillArgs),

    /// Record a payment between two users
    Pay(splitledger::cli::PayArgs),

    /// Show who owes whom
    Balances(splitledger::cli::BalancesArgs),

    /// Show a group's bills and payments
    History {
        /// Group name or ID
        group: String,
    },

    /// Recompute all balances from the recorded history
    Rebuild,

    /// Check stored balances against the recorded history
    Verify,

    /// Export the ledger
    #[command(subcommand)]
    Export(splitledger::cli::ExportCommands),

    /// Backup management commands
    #[command(subcommand)]
    Backup(splitledger::cli::BackupCommands),

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Change a setting
    Set {
        /// Setting name (default_currency, log_level, audit_enabled,
        /// backup_retention, backup_on_rebuild)
        key: String,
        /// New value
        value: String,
    },
}

/// Initializes the tracing subscriber, writing to stderr
///
/// `SPLITLEDGER_LOG` wins over `RUST_LOG`, which wins over the configured level.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = LedgerPaths::new()?.with_store_file(cli.store);
    let mut settings = Settings::load_or_default(&paths)?;
    init_tracing(&settings.log_level);

    match cli.command {
        Some(Commands::Init) => {
            println!("Initializing splitledger at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            let repo = JsonStoreRepository::new(paths.store_file());
            if repo.initialize(&settings.default_currency)? {
                println!("Created ledger: {}", repo.path().display());
            } else {
                println!("Ledger already exists: {}", repo.path().display());
            }
            if !paths.settings_file().exists() {
                settings.save(&paths)?;
            }
            println!("Initialization complete!");
            println!();
            println!("Next: 'splitledger user add NAME'");
            println!("      'splitledger group create NAME -m NAME'");
        }
        Some(Commands::Config { action }) => match action {
            Some(ConfigAction::Set { key, value }) => {
                settings.set(&key, &value)?;
                settings.save(&paths)?;
                println!("Set {} = {}", key, value);
            }
            None => {
                println!("splitledger Configuration");
                println!("=========================");
                println!("Data directory:   {}", paths.base_dir().display());
                println!("Ledger file:      {}", paths.store_file().display());
                println!("Settings file:    {}", paths.settings_file().display());
                println!("Audit log:        {}", paths.audit_log().display());
                println!("Backup directory: {}", paths.backup_dir().display());
                println!();
                println!("Settings:");
                println!("  default_currency:  {}", settings.default_currency);
                println!("  log_level:         {}", settings.log_level);
                println!("  audit_enabled:     {}", settings.audit_enabled);
                println!("  backup_retention:  {}", settings.backup_retention);
                println!("  backup_on_rebuild: {}", settings.backup_on_rebuild);
            }
        },
        Some(Commands::User(cmd)) => {
            handle_user_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Group(cmd)) => {
            handle_group_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Expense(cmd)) => {
            handle_expense_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Bill(args)) => {
            handle_bill_command(&paths, &settings, args)?;
        }
        Some(Commands::Pay(args)) => {
            handle_pay_command(&paths, &settings, args)?;
        }
        Some(Commands::Balances(args)) => {
            handle_balances_command(&paths, args)?;
        }
        Some(Commands::History { group }) => {
            handle_history_command(&paths, &group)?;
        }
        Some(Commands::Rebuild) => {
            handle_rebuild_command(&paths, &settings)?;
        }
        Some(Commands::Verify) => {
            handle_verify_command(&paths)?;
        }
        Some(Commands::Export(cmd)) => {
            handle_export_command(&paths, cmd)?;
        }
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Audit { limit }) => {
            handle_audit_command(&paths, limit)?;
        }
        None => {
            println!("splitledger - shared expense ledger");
            println!();
            println!("Run 'splitledger --help' for usage information.");
            println!("Run 'splitledger init' to create a ledger.");
        }
    }

    Ok(())
}

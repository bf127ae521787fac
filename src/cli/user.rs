//! User CLI commands

use clap::Subcommand;

use crate::config::{LedgerPaths, Settings};
use crate::display::format_user_list;
use crate::error::LedgerResult;
use crate::services::RegistryService;

use super::{audit_logger, open_repository};

/// User subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user (existing names are reused)
    Add {
        /// Display name
        name: String,
    },
    /// List all users
    List,
}

/// Handle a user command
pub fn handle_user_command(
    paths: &LedgerPaths,
    settings: &Settings,
    cmd: UserCommands,
) -> LedgerResult<()> {
    let repo = open_repository(paths);
    let audit = audit_logger(paths, settings);
    let mut service = RegistryService::new(&repo);
    if let Some(audit) = &audit {
        service = service.with_audit(audit);
    }

    match cmd {
        UserCommands::Add { name } => {
            let (user_id, created) = service.upsert_user(&name)?;
            if created {
                println!("Added user: {} ({})", name, user_id);
            } else {
                println!("User already exists: {} ({})", name, user_id);
            }
        }
        UserCommands::List => {
            println!("{}", format_user_list(&service.list_users()?));
        }
    }

    Ok(())
}

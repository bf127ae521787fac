//! Group CLI commands

use clap::Subcommand;

use crate::config::{LedgerPaths, Settings};
use crate::display::{format_group_details, format_group_list};
use crate::error::LedgerResult;
use crate::models::UserId;
use crate::services::RegistryService;
use crate::storage::StoreRepository;

use super::{audit_logger, open_repository};

/// Group subcommands
#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a group
    Create {
        /// Group name
        name: String,
        /// Members by name or ID
        #[arg(short, long = "member", value_name = "USER")]
        members: Vec<String>,
    },
    /// Add a user to an existing group
    AddMember {
        /// Group name or ID
        group: String,
        /// User name or ID
        user: String,
    },
    /// List all groups
    List,
    /// Show a group and its members
    Show {
        /// Group name or ID
        group: String,
    },
}

/// Handle a group command
pub fn handle_group_command(
    paths: &LedgerPaths,
    settings: &Settings,
    cmd: GroupCommands,
) -> LedgerResult<()> {
    let repo = open_repository(paths);
    let audit = audit_logger(paths, settings);
    let mut service = RegistryService::new(&repo);
    if let Some(audit) = &audit {
        service = service.with_audit(audit);
    }

    match cmd {
        GroupCommands::Create { name, members } => {
            let member_ids = members
                .iter()
                .map(|m| service.resolve_user(m))
                .collect::<LedgerResult<Vec<UserId>>>()?;
            let group_id = service.create_group(&name, &member_ids)?;
            println!("Created group: {} ({})", name, group_id);
            if !member_ids.is_empty() {
                println!("  Members: {}", members.join(", "));
            }
        }
        GroupCommands::AddMember { group, user } => {
            let group_id = service.resolve_group(&group)?;
            let user_id = service.resolve_user(&user)?;
            if service.add_member(&group_id, &user_id)? {
                println!("Added {} to {}", user, group);
            } else {
                println!("{} is already a member of {}", user, group);
            }
        }
        GroupCommands::List => {
            println!("{}", format_group_list(&service.list_groups()?));
        }
        GroupCommands::Show { group } => {
            let group_id = service.resolve_group(&group)?;
            let store = repo.load()?;
            let group = store.require_group(&group_id)?;
            print!("{}", format_group_details(&store, group));
        }
    }

    Ok(())
}

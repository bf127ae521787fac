//! CLI commands for data export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};

use crate::config::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::export::{export_activity_csv, export_balances_csv, export_full_json, export_full_yaml};
use crate::services::registry::resolve_group;
use crate::storage::StoreRepository;

use super::open_repository;

/// What a CSV export contains
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CsvContent {
    /// One row per share and per payment
    Activity,
    /// Netted balances
    Balances,
}

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export the full ledger as JSON
    Json {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export the full ledger as YAML
    Yaml {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export activity or balances as CSV
    Csv {
        /// Rows to export
        #[arg(value_enum, default_value = "activity")]
        content: CsvContent,
        /// Limit balances to one group (name or ID)
        #[arg(short, long)]
        group: Option<String>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn open_output(output: Option<&Path>) -> LedgerResult<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                LedgerError::Export(format!("Failed to create file {}: {}", path.display(), e))
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}

/// Handle export commands
pub fn handle_export_command(paths: &LedgerPaths, cmd: ExportCommands) -> LedgerResult<()> {
    let store = open_repository(paths).load()?;

    let output = match cmd {
        ExportCommands::Json { output } => {
            let mut writer = open_output(output.as_deref())?;
            export_full_json(&store, &mut writer)?;
            writer.flush().map_err(|e| LedgerError::io("Failed to write export", e))?;
            output
        }
        ExportCommands::Yaml { output } => {
            let mut writer = open_output(output.as_deref())?;
            export_full_yaml(&store, &mut writer)?;
            writer.flush().map_err(|e| LedgerError::io("Failed to write export", e))?;
            output
        }
        ExportCommands::Csv {
            content,
            group,
            output,
        } => {
            let writer = open_output(output.as_deref())?;
            match content {
                CsvContent::Activity => export_activity_csv(&store, writer)?,
                CsvContent::Balances => {
                    let group_id = group.map(|g| resolve_group(&store, &g)).transpose()?;
                    export_balances_csv(&store, writer, group_id.as_ref())?
                }
            }
            output
        }
    };

    if let Some(path) = output {
        eprintln!("Exported to: {}", path.display());
    }
    Ok(())
}

//! YAML export
//!
//! Same content as the JSON export, in a form that is easier to read.

use std::io::Write;

use crate::error::{LedgerError, LedgerResult};
use crate::export::json::FullExport;
use crate::models::Store;

/// Write the full export as YAML with a short header comment
pub fn export_full_yaml<W: Write>(store: &Store, writer: &mut W) -> LedgerResult<()> {
    let export = FullExport::from_store(store);
    let to_export_err = |e: std::io::Error| LedgerError::Export(e.to_string());

    writeln!(writer, "# splitledger export").map_err(to_export_err)?;
    writeln!(writer, "# Generated: {}", export.exported_at).map_err(to_export_err)?;
    writeln!(writer, "# App Version: {}", export.app_version).map_err(to_export_err)?;
    writeln!(writer).map_err(to_export_err)?;

    serde_yaml::to_writer(writer, &export).map_err(|e| LedgerError::Export(e.to_string()))?;
    Ok(())
}

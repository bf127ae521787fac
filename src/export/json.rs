//! JSON export
//!
//! Writes the complete ledger document wrapped with export metadata.

use std::collections::HashSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{GroupId, Store, UserId};

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Full ledger export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullExport {
    pub schema_version: String,
    pub exported_at: DateTime<Utc>,
    /// Version of splitledger that wrote the export
    pub app_version: String,
    pub metadata: ExportMetadata,
    pub store: Store,
}

/// Counts and date range of the exported ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub user_count: usize,
    pub group_count: usize,
    pub transaction_count: usize,
    pub payment_count: usize,
    pub earliest_event: Option<DateTime<Utc>>,
    pub latest_event: Option<DateTime<Utc>>,
}

impl FullExport {
    pub fn from_store(store: &Store) -> Self {
        let timestamps = store
            .transactions
            .iter()
            .map(|t| t.created_at)
            .chain(store.payments.iter().map(|p| p.created_at));
        let (earliest_event, latest_event) = timestamps.fold((None, None), |(lo, hi), ts| {
            (
                Some(lo.map_or(ts, |l: DateTime<Utc>| l.min(ts))),
                Some(hi.map_or(ts, |h: DateTime<Utc>| h.max(ts))),
            )
        });

        Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            metadata: ExportMetadata {
                user_count: store.users.len(),
                group_count: store.groups.len(),
                transaction_count: store.transactions.len(),
                payment_count: store.payments.len(),
                earliest_event,
                latest_event,
            },
            store: store.clone(),
        }
    }

    /// Check that every record points at known users and groups
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        let users: HashSet<&UserId> = self.store.users.iter().map(|u| &u.id).collect();
        let groups: HashSet<&GroupId> = self.store.groups.iter().map(|g| &g.id).collect();

        for group in &self.store.groups {
            if let Some(missing) = group.member_ids.iter().find(|id| !users.contains(id)) {
                return Err(format!("Group {} has unknown member {}", group.id, missing));
            }
        }
        for txn in &self.store.transactions {
            if !groups.contains(&txn.group_id) {
                return Err(format!(
                    "Transaction {} references unknown group {}",
                    txn.id, txn.group_id
                ));
            }
            if !users.contains(&txn.paid_by) {
                return Err(format!(
                    "Transaction {} references unknown payer {}",
                    txn.id, txn.paid_by
                ));
            }
        }
        for payment in &self.store.payments {
            if !groups.contains(&payment.group_id) {
                return Err(format!(
                    "Payment {} references unknown group {}",
                    payment.id, payment.group_id
                ));
            }
            for user_id in [&payment.from_user_id, &payment.to_user_id] {
                if !users.contains(user_id) {
                    return Err(format!(
                        "Payment {} references unknown user {}",
                        payment.id, user_id
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Write the full export as pretty JSON
pub fn export_full_json<W: Write>(store: &Store, writer: &mut W) -> LedgerResult<()> {
    let export = FullExport::from_store(store);
    serde_json::to_writer_pretty(&mut *writer, &export)
        .map_err(|e| LedgerError::Export(e.to_string()))?;
    writeln!(writer).map_err(|e| LedgerError::Export(e.to_string()))?;
    Ok(())
}

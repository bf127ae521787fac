//! CSV export
//!
//! Spreadsheet-friendly views of the ledger: one row per share of every
//! transaction plus one row per payment, or one row per netted balance.

use std::io::Write;

use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{from_minor_units, GroupId, Store};

#[derive(Serialize)]
struct ActivityRow<'a> {
    kind: &'static str,
    id: &'a str,
    created_at: String,
    group: String,
    title: &'a str,
    paid_by: String,
    participant: String,
    amount: String,
    total: String,
    currency: &'a str,
}

#[derive(Serialize)]
struct BalanceRow<'a> {
    scope: String,
    from: String,
    to: String,
    amount: String,
    currency: &'a str,
}

fn export_err(e: csv::Error) -> LedgerError {
    LedgerError::Export(e.to_string())
}

fn group_name(store: &Store, group_id: &GroupId) -> String {
    store
        .group(group_id)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| group_id.to_string())
}

/// Export every transaction share and payment, in append order
pub fn export_activity_csv<W: Write>(store: &Store, writer: W) -> LedgerResult<()> {
    let mut csv = csv::Writer::from_writer(writer);

    for txn in &store.transactions {
        for share in &txn.split.shares {
            csv.serialize(ActivityRow {
                kind: "share",
                id: txn.id.as_str(),
                created_at: txn.created_at.to_rfc3339(),
                group: group_name(store, &txn.group_id),
                title: &txn.title,
                paid_by: store.display_name(&txn.paid_by),
                participant: store.display_name(&share.user_id),
                amount: from_minor_units(share.share_amount_cents).to_string(),
                total: from_minor_units(txn.total_amount_cents).to_string(),
                currency: &txn.currency,
            })
            .map_err(export_err)?;
        }
    }

    for payment in &store.payments {
        let amount = from_minor_units(payment.amount_cents).to_string();
        csv.serialize(ActivityRow {
            kind: "payment",
            id: payment.id.as_str(),
            created_at: payment.created_at.to_rfc3339(),
            group: group_name(store, &payment.group_id),
            title: &payment.notes,
            paid_by: store.display_name(&payment.from_user_id),
            participant: store.display_name(&payment.to_user_id),
            amount: amount.clone(),
            total: amount,
            currency: &payment.currency,
        })
        .map_err(export_err)?;
    }

    csv.flush()
        .map_err(|e| LedgerError::Export(e.to_string()))?;
    Ok(())
}

/// Export netted balances, for one group or for every scope
pub fn export_balances_csv<W: Write>(
    store: &Store,
    writer: W,
    group_id: Option<&GroupId>,
) -> LedgerResult<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut scopes = Vec::new();
    match group_id {
        Some(group_id) => {
            store.require_group(group_id)?;
            if let Some(net) = store.balances.group(group_id) {
                scopes.push((group_name(store, group_id), net));
            }
        }
        None => {
            scopes.push(("global".to_string(), &store.balances.global.net));
            for (id, partition) in &store.balances.by_group {
                scopes.push((group_name(store, id), &partition.net));
            }
        }
    }

    for (scope, net) in scopes {
        for edge in net.edges() {
            csv.serialize(BalanceRow {
                scope: scope.clone(),
                from: store.display_name(&edge.from_user_id),
                to: store.display_name(&edge.to_user_id),
                amount: from_minor_units(edge.amount_cents).to_string(),
                currency: store.currency(),
            })
            .map_err(export_err)?;
        }
    }

    csv.flush()
        .map_err(|e| LedgerError::Export(e.to_string()))?;
    Ok(())
}

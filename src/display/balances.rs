//! Balance display formatting
//!
//! Amounts are shown with the store's currency code, e.g. `12.50 CAD`.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{BalanceDrift, BalanceEdge, Money, Store};
use crate::services::{Position, ReconciliationSummary};

#[derive(Tabled)]
struct EdgeRow {
    #[tabled(rename = "Owes")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "With")]
    counterparty: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Amount")]
    amount: String,
}

#[derive(Tabled)]
struct DriftRow {
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Owes")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Stored")]
    stored: String,
    #[tabled(rename = "Expected")]
    expected: String,
}

#[derive(Tabled)]
struct DiscrepancyRow {
    #[tabled(rename = "Between")]
    pair: String,
    #[tabled(rename = "Ledger")]
    ledger: String,
    #[tabled(rename = "Reported")]
    reported: String,
}

fn amount(store: &Store, cents: i64) -> String {
    Money::from_cents(cents).format_with_code(store.currency())
}

/// Format netted debts as a table
pub fn format_balance_edges(store: &Store, edges: &[BalanceEdge]) -> String {
    if edges.is_empty() {
        return "All settled up.".to_string();
    }

    let rows = edges.iter().map(|e| EdgeRow {
        from: store.display_name(&e.from_user_id),
        to: store.display_name(&e.to_user_id),
        amount: amount(store, e.amount_cents),
    });
    Table::new(rows).with(Style::sharp()).to_string()
}

/// Format a user's position against each counterparty
pub fn format_positions(store: &Store, positions: &[Position]) -> String {
    if positions.is_empty() {
        return "All settled up.".to_string();
    }

    let rows = positions.iter().map(|p| PositionRow {
        counterparty: store.display_name(&p.counterparty),
        status: if p.net_cents > 0 { "owes you" } else { "you owe" },
        amount: amount(store, p.net_cents.abs()),
    });

    let net: i64 = positions.iter().map(|p| p.net_cents).sum();
    format!(
        "{}\nNet: {}",
        Table::new(rows).with(Style::sharp()),
        amount(store, net)
    )
}

/// Format pairs whose stored balance differs from a replay
pub fn format_drift(store: &Store, drift: &[BalanceDrift]) -> String {
    if drift.is_empty() {
        return "Balances match the transaction history.".to_string();
    }

    let rows = drift.iter().map(|d| DriftRow {
        scope: d.scope.to_string(),
        from: store.display_name(&d.from_user_id),
        to: store.display_name(&d.to_user_id),
        stored: amount(store, d.stored_cents),
        expected: amount(store, d.expected_cents),
    });
    Table::new(rows).with(Style::sharp()).to_string()
}

/// Format a comparison against externally reported balances
pub fn format_reconciliation(store: &Store, summary: &ReconciliationSummary) -> String {
    if summary.is_consistent() {
        return "Reported balances agree with the ledger.".to_string();
    }

    let rows = summary.discrepancies.iter().map(|d| DiscrepancyRow {
        pair: format!(
            "{} -> {}",
            store.display_name(&d.user_a),
            store.display_name(&d.user_b)
        ),
        ledger: amount(store, d.ledger_cents),
        reported: amount(store, d.reported_cents),
    });
    format!(
        "{}\nThe ledger figures are authoritative.",
        Table::new(rows).with(Style::sharp())
    )
}

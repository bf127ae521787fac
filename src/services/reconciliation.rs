//! Reconciliation of externally reported balances
//!
//! Balances shown by other tools are advisory. This module compares them with
//! the ledger's own netted graph and lists every pair that is off by more than
//! [`TOLERANCE_CENTS`]. The ledger figure is always the one to keep.

use serde::Deserialize;

use crate::error::LedgerResult;
use crate::models::{BalanceEdge, NetGraph, UserId};

/// Largest difference, in cents, that still counts as agreement
pub const TOLERANCE_CENTS: i64 = 1;

/// A member pair whose reported figure disagrees with the ledger
///
/// Amounts are signed from `user_a`'s point of view: positive means `user_a`
/// owes `user_b`. `user_a` sorts before `user_b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub user_a: UserId,
    pub user_b: UserId,
    pub ledger_cents: i64,
    pub reported_cents: i64,
}

impl Discrepancy {
    /// Reported minus ledger
    pub fn difference(&self) -> i64 {
        self.reported_cents.saturating_sub(self.ledger_cents)
    }
}

/// Result of comparing reported balances with the ledger
#[derive(Debug, Clone)]
pub struct ReconciliationSummary {
    /// The ledger's edges, which are authoritative
    pub authoritative: Vec<BalanceEdge>,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationSummary {
    /// Whether every reported pair is within tolerance
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// File format for reported balances: a plain list of edges
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReportedFile {
    Edges(Vec<BalanceEdge>),
    Wrapped { edges: Vec<BalanceEdge> },
}

/// Parse reported balances from JSON
///
/// Accepts either a bare array of edges or `{"edges": [...]}`.
pub fn parse_reported(text: &str) -> LedgerResult<Vec<BalanceEdge>> {
    Ok(match serde_json::from_str::<ReportedFile>(text)? {
        ReportedFile::Edges(edges) | ReportedFile::Wrapped { edges } => edges,
    })
}

fn netted(edges: &[BalanceEdge]) -> LedgerResult<NetGraph> {
    let mut net = NetGraph::new();
    for edge in edges {
        net.apply_delta(&edge.from_user_id, &edge.to_user_id, edge.amount_cents)?;
    }
    Ok(net)
}

fn signed(net: &NetGraph, a: &UserId, b: &UserId) -> i64 {
    net.edge(a, b) - net.edge(b, a)
}

/// Compare reported edges against the ledger's edges
///
/// Reported edges are netted first, so a report listing both directions of a
/// pair is compared by its net figure. A report whose pairs net outside the
/// `i64` range is rejected with `InvalidAmount`.
pub fn reconcile(
    ledger: &[BalanceEdge],
    reported: &[BalanceEdge],
) -> LedgerResult<ReconciliationSummary> {
    let ledger_net = netted(ledger)?;
    let reported_net = netted(reported)?;

    let mut pairs: Vec<(UserId, UserId)> = ledger_net
        .edges()
        .into_iter()
        .chain(reported_net.edges())
        .map(|e| {
            if e.from_user_id <= e.to_user_id {
                (e.from_user_id, e.to_user_id)
            } else {
                (e.to_user_id, e.from_user_id)
            }
        })
        .collect();
    pairs.sort();
    pairs.dedup();

    let discrepancies = pairs
        .into_iter()
        .filter_map(|(a, b)| {
            let ledger_cents = signed(&ledger_net, &a, &b);
            let reported_cents = signed(&reported_net, &a, &b);
            let beyond = reported_cents.abs_diff(ledger_cents) > TOLERANCE_CENTS.unsigned_abs();
            beyond.then(|| Discrepancy {
                user_a: a,
                user_b: b,
                ledger_cents,
                reported_cents,
            })
        })
        .collect();

    Ok(ReconciliationSummary {
        authoritative: ledger_net.edges(),
        discrepancies,
    })
}

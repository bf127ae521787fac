//! Balance graph of netted debts
//!
//! Net debts are stored as a sparse adjacency map `net[from][to] = cents`
//! where every stored amount is positive and, for any pair of members, at most
//! one direction is present. Absent entries mean zero.
//!
//! The graph is a projection of the event log: it can always be thrown away
//! and rebuilt by replaying transactions and payments through
//! [`NetGraph::apply_delta`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::ids::{GroupId, UserId};
use crate::error::{LedgerError, LedgerResult};

/// One netted debt: `from_user_id` owes `to_user_id` `amount_cents`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceEdge {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount_cents: i64,
}

/// Sparse adjacency map of net debts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetGraph(BTreeMap<UserId, BTreeMap<UserId, i64>>);

impl NetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount `from` owes `to`, zero when absent
    pub fn edge(&self, from: &UserId, to: &UserId) -> i64 {
        self.0
            .get(from)
            .and_then(|tos| tos.get(to))
            .copied()
            .unwrap_or(0)
    }

    fn set_edge(&mut self, from: &UserId, to: &UserId, value: i64) {
        if value > 0 {
            self.0
                .entry(from.clone())
                .or_default()
                .insert(to.clone(), value);
            return;
        }

        if let Some(tos) = self.0.get_mut(from) {
            tos.remove(to);
            if tos.is_empty() {
                self.0.remove(from);
            }
        }
    }

    /// Add `delta_cents` of debt from `from_id` to `to_id` and net it
    ///
    /// A negative delta is the same as a positive delta in the opposite
    /// direction. After the update the pair holds at most one edge. A pair
    /// whose net would leave the `i64` range fails with `InvalidAmount` and
    /// the graph is left unchanged.
    pub fn apply_delta(
        &mut self,
        from_id: &UserId,
        to_id: &UserId,
        delta_cents: i64,
    ) -> LedgerResult<()> {
        let net = self.netted(from_id, to_id, delta_cents)?;
        self.set_net(from_id, to_id, net);
        Ok(())
    }

    /// Signed net of the pair after adding `delta_cents`; positive means `from_id` owes
    fn netted(&self, from_id: &UserId, to_id: &UserId, delta_cents: i64) -> LedgerResult<i64> {
        if from_id == to_id {
            return Ok(0);
        }

        self.edge(from_id, to_id)
            .checked_sub(self.edge(to_id, from_id))
            .and_then(|net| net.checked_add(delta_cents))
            .filter(|net| *net != i64::MIN)
            .ok_or_else(|| {
                LedgerError::InvalidAmount(format!(
                    "balance between {} and {} is out of range",
                    from_id, to_id
                ))
            })
    }

    fn set_net(&mut self, from_id: &UserId, to_id: &UserId, net: i64) {
        if from_id == to_id {
            return;
        }
        self.set_edge(from_id, to_id, net.max(0));
        self.set_edge(to_id, from_id, net.saturating_neg().max(0));
    }

    /// Flatten the map into edges ordered by `(from, to)`
    pub fn edges(&self) -> Vec<BalanceEdge> {
        self.0
            .iter()
            .flat_map(|(from, tos)| {
                tos.iter().map(move |(to, amount)| BalanceEdge {
                    from_user_id: from.clone(),
                    to_user_id: to.clone(),
                    amount_cents: *amount,
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that every stored amount is positive and no pair is two-way
    pub fn is_netted(&self) -> bool {
        self.0.iter().all(|(from, tos)| {
            !tos.is_empty()
                && tos
                    .iter()
                    .all(|(to, amount)| *amount > 0 && from != to && self.edge(to, from) == 0)
        })
    }

    /// Signed position of `user_id` against each counterparty
    ///
    /// Positive means the counterparty owes `user_id`, negative means
    /// `user_id` owes the counterparty.
    pub fn position_of(&self, user_id: &UserId) -> BTreeMap<UserId, i64> {
        let mut position = BTreeMap::new();
        if let Some(tos) = self.0.get(user_id) {
            for (to, amount) in tos {
                position.insert(to.clone(), -amount);
            }
        }
        for (from, tos) in &self.0 {
            if let Some(amount) = tos.get(user_id) {
                position.insert(from.clone(), *amount);
            }
        }
        position
    }
}

/// Net debts of one scope, serialized as `{"net": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupBalance {
    #[serde(default)]
    pub net: NetGraph,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Which graph a balance belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BalanceScope {
    Global,
    Group(GroupId),
}

impl fmt::Display for BalanceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Group(id) => write!(f, "group {}", id),
        }
    }
}

/// A pair whose stored amount differs from a reference graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDrift {
    pub scope: BalanceScope,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub stored_cents: i64,
    pub expected_cents: i64,
}

/// The balance projection stored in the ledger document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub by_group: BTreeMap<GroupId, GroupBalance>,

    #[serde(default)]
    pub global: GroupBalance,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Balances {
    /// Get or create the partition for a group
    pub fn ensure_group(&mut self, group_id: &GroupId) -> &mut GroupBalance {
        self.by_group.entry(group_id.clone()).or_default()
    }

    /// Net graph of a group, if it has a partition
    pub fn group(&self, group_id: &GroupId) -> Option<&NetGraph> {
        self.by_group.get(group_id).map(|g| &g.net)
    }

    /// Apply a debt delta to the group graph and the global graph
    ///
    /// Both graphs are checked before either is written, so an overflow
    /// leaves the projection untouched.
    pub fn apply_debt(
        &mut self,
        group_id: &GroupId,
        from_id: &UserId,
        to_id: &UserId,
        delta_cents: i64,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        let empty = NetGraph::new();
        let group_net = self
            .group(group_id)
            .unwrap_or(&empty)
            .netted(from_id, to_id, delta_cents)?;
        let global_net = self.global.net.netted(from_id, to_id, delta_cents)?;

        self.ensure_group(group_id)
            .net
            .set_net(from_id, to_id, group_net);
        self.global.net.set_net(from_id, to_id, global_net);
        self.updated_at = Some(now);
        Ok(())
    }

    /// Drop every edge and partition, keeping unknown fields
    pub fn clear(&mut self) {
        self.by_group.clear();
        self.global = GroupBalance::default();
        self.updated_at = None;
    }

    /// Compare against a reference projection, pair by pair
    ///
    /// Empty and missing partitions are treated alike.
    pub fn drift_from(&self, expected: &Balances) -> Vec<BalanceDrift> {
        let empty = NetGraph::new();
        let mut drift =
            compare_graphs(BalanceScope::Global, &self.global.net, &expected.global.net);

        let group_ids: BTreeSet<&GroupId> =
            self.by_group.keys().chain(expected.by_group.keys()).collect();
        for group_id in group_ids {
            let stored = self.group(group_id).unwrap_or(&empty);
            let reference = expected.group(group_id).unwrap_or(&empty);
            drift.extend(compare_graphs(
                BalanceScope::Group(group_id.clone()),
                stored,
                reference,
            ));
        }
        drift
    }
}

fn compare_graphs(
    scope: BalanceScope,
    stored: &NetGraph,
    expected: &NetGraph,
) -> Vec<BalanceDrift> {
    let pairs: BTreeSet<(UserId, UserId)> = stored
        .edges()
        .into_iter()
        .chain(expected.edges())
        .map(|e| (e.from_user_id, e.to_user_id))
        .collect();

    pairs
        .into_iter()
        .filter_map(|(from, to)| {
            let stored_cents = stored.edge(&from, &to);
            let expected_cents = expected.edge(&from, &to);
            (stored_cents != expected_cents).then(|| BalanceDrift {
                scope: scope.clone(),
                from_user_id: from,
                to_user_id: to,
                stored_cents,
                expected_cents,
            })
        })
        .collect()
}

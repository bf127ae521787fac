//! Bill ingestion
//!
//! Turns an already-parsed bill (item names with costs, plus which members
//! took each item) into exact per-member cent shares for a custom split.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{LedgerError, LedgerResult};
use crate::models::money::deserialize_decimal;
use crate::models::{Amount, GroupId, Store, UserId};

use super::ledger::{equal_shares, ItemInput, ShareInput};
use super::registry::resolve_user;

/// One line of a parsed bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillLine {
    #[serde(alias = "item_name")]
    pub item: String,

    #[serde(deserialize_with = "deserialize_decimal")]
    pub cost: Decimal,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BillLine {
    pub fn new(item: impl Into<String>, cost: Decimal) -> Self {
        Self {
            item: item.into(),
            cost,
            extra: Map::new(),
        }
    }
}

/// A parsed bill with per-item member assignments
///
/// Assignments map an item name to member ids or display names. Items with
/// no entry, or an empty list, are shared by the whole group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillInput {
    pub items: Vec<BillLine>,

    #[serde(default)]
    pub assignments: HashMap<String, Vec<String>>,
}

impl BillInput {
    /// Parse a bill from its JSON text
    pub fn from_json(text: &str) -> LedgerResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn assign(mut self, item: impl Into<String>, members: &[&str]) -> Self {
        self.assignments
            .insert(item.into(), members.iter().map(|m| m.to_string()).collect());
        self
    }

    /// Sum of all item costs
    pub fn total(&self) -> Decimal {
        self.items.iter().map(|line| line.cost).sum()
    }
}

/// Per-member shares and normalized items for one bill
#[derive(Debug, Clone, PartialEq)]
pub struct BillAllocation {
    /// Shares in group member order
    pub shares: Vec<ShareInput>,
    pub items: Vec<ItemInput>,
    pub total_cents: i64,
}

/// Allocate every item's cost among its assignees
///
/// Each item is split with the equal-split rule, so the first assignees
/// absorb the leftover cents of that item.
pub fn allocate_bill(
    store: &Store,
    group_id: &GroupId,
    bill: &BillInput,
) -> LedgerResult<BillAllocation> {
    let group = store.require_group(group_id)?;

    let mut names = HashSet::new();
    for line in &bill.items {
        if !names.insert(line.item.as_str()) {
            return Err(LedgerError::InvalidAssignment(format!(
                "item '{}' appears more than once on the bill",
                line.item
            )));
        }
    }
    if let Some(stray) = bill.assignments.keys().find(|k| !names.contains(k.as_str())) {
        return Err(LedgerError::InvalidAssignment(format!(
            "assignment for '{}' which is not on the bill",
            stray
        )));
    }

    let mut totals: BTreeMap<UserId, i64> = BTreeMap::new();
    let mut items = Vec::with_capacity(bill.items.len());
    let mut total_cents: i64 = 0;

    for line in &bill.items {
        let cost_cents = Amount::Decimal(line.cost).to_minor_units()?;
        if cost_cents < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "item '{}' has a negative cost",
                line.item
            )));
        }

        let identifiers = bill
            .assignments
            .get(&line.item)
            .filter(|ids| !ids.is_empty());
        let assignees = match identifiers {
            Some(identifiers) => {
                let mut resolved: Vec<UserId> = Vec::with_capacity(identifiers.len());
                for identifier in identifiers {
                    let user_id = resolve_user(store, identifier)?;
                    if !group.has_member(&user_id) {
                        return Err(LedgerError::InvalidAssignment(format!(
                            "'{}' is not a member of group {}",
                            identifier, group.name
                        )));
                    }
                    if !resolved.contains(&user_id) {
                        resolved.push(user_id);
                    }
                }
                resolved
            }
            None if group.member_ids.is_empty() => {
                return Err(LedgerError::InvalidAssignment(format!(
                    "item '{}' is unassigned and group {} has no members",
                    line.item, group.name
                )));
            }
            None => group.member_ids.clone(),
        };

        let mut allocated = Map::new();
        for (user_id, cents) in assignees.iter().zip(equal_shares(cost_cents, assignees.len())) {
            *totals.entry(user_id.clone()).or_insert(0) += cents;
            allocated.insert(user_id.to_string(), json!(cents));
        }
        total_cents = total_cents
            .checked_add(cost_cents)
            .ok_or_else(|| LedgerError::InvalidAmount("bill total out of range".into()))?;

        let mut extra = line.extra.clone();
        extra.insert("allocated_cents".into(), Value::Object(allocated));
        if identifiers.is_none() {
            extra.insert("shared_by_group".into(), Value::Bool(true));
        }

        items.push(ItemInput {
            name: line.item.clone(),
            cost: Amount::Cents(cost_cents),
            assigned_member_ids: assignees,
            extra,
        });
    }

    let shares = group
        .member_ids
        .iter()
        .filter_map(|user_id| {
            totals
                .get(user_id)
                .map(|cents| ShareInput::cents(user_id.clone(), *cents))
        })
        .collect();

    Ok(BillAllocation {
        shares,
        items,
        total_cents,
    })
}

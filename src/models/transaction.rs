//! Transaction and payment records
//!
//! Both are immutable entries of the append-only event log. A transaction is
//! one bill: who paid, how the cost was shared, and the debt edges that result.
//! A payment is a direct transfer that reduces what one member owes another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::ids::{GroupId, PaymentId, TransactionId, UserId};

/// How a transaction's total was divided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMethod {
    Equal,
    Custom,
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// One participant's portion of a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub user_id: UserId,
    pub share_amount_cents: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Share {
    pub fn new(user_id: UserId, share_amount_cents: i64) -> Self {
        Self {
            user_id,
            share_amount_cents,
            extra: Map::new(),
        }
    }
}

/// The division of a bill among its participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub method: SplitMethod,
    pub participant_ids: Vec<UserId>,
    pub shares: Vec<Share>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A debt created by a transaction: `from_user_id` owes `to_user_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount_cents: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Debt {
    pub fn new(from_user_id: UserId, to_user_id: UserId, amount_cents: i64) -> Self {
        Self {
            from_user_id,
            to_user_id,
            amount_cents,
            extra: Map::new(),
        }
    }
}

/// A line of an itemized bill kept on the transaction for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub name: String,
    pub cost_cents: i64,

    #[serde(default)]
    pub assigned_member_ids: Vec<UserId>,

    /// Caller-supplied fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An immutable record of one shared bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub group_id: GroupId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub currency: String,
    pub total_amount_cents: i64,
    pub paid_by: UserId,
    pub split: Split,
    #[serde(default)]
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<BillItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    /// The share recorded for a user, zero if they are not a participant
    pub fn share_of(&self, user_id: &UserId) -> i64 {
        self.split
            .shares
            .iter()
            .filter(|s| &s.user_id == user_id)
            .fold(0, |sum, s| sum.saturating_add(s.share_amount_cents))
    }

    /// Sum of all debt edges created by this transaction
    pub fn debt_total(&self) -> i64 {
        self.debts
            .iter()
            .fold(0, |sum, d| sum.saturating_add(d.amount_cents))
    }

    /// Check the conservation invariants of the record
    ///
    /// Shares add up to the total, and debts add up to everything the payer
    /// did not consume themselves. Sums that leave the `i64` range never
    /// balance.
    pub fn is_balanced(&self) -> bool {
        let shares = checked_sum(self.split.shares.iter().map(|s| s.share_amount_cents));
        let payer_share = checked_sum(
            self.split
                .shares
                .iter()
                .filter(|s| s.user_id == self.paid_by)
                .map(|s| s.share_amount_cents),
        );
        let owed = checked_sum(self.debts.iter().map(|d| d.amount_cents))
            .zip(payer_share)
            .and_then(|(debts, own)| debts.checked_add(own));

        shares == Some(self.total_amount_cents)
            && owed == Some(self.total_amount_cents)
            && self.debts.iter().all(|d| d.to_user_id == self.paid_by)
    }
}

fn checked_sum(amounts: impl IntoIterator<Item = i64>) -> Option<i64> {
    amounts.into_iter().try_fold(0i64, i64::checked_add)
}

/// An immutable record of a direct transfer between two members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub group_id: GroupId,
    pub created_at: DateTime<Utc>,
    pub currency: String,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount_cents: i64,
    #[serde(default)]
    pub notes: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

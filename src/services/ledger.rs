//! Ledger engine
//!
//! Records bills (equal or custom split) and payments as immutable entries,
//! keeps the balance graph netted after each one, and can rebuild the graph
//! from the full event history.
//!
//! The `record_*` functions work on an explicit [`Store`] value and validate
//! everything before their first mutation, so an error leaves the store as it
//! was. [`LedgerService`] wraps them in a load/mutate/save cycle against a
//! [`StoreRepository`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::audit::{generate_detailed_diff, AuditEntry, AuditLogger};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Amount, BalanceDrift, BalanceEdge, Balances, BillItem, Debt, GroupId, Payment, PaymentId,
    Share, Split, SplitMethod, Store, Transaction, TransactionId, UserId,
};
use crate::storage::StoreRepository;

use super::ingestion::{allocate_bill, BillInput};
use super::record_audit;

/// Request to record a bill divided evenly among participants
#[derive(Debug, Clone)]
pub struct EqualSplit {
    pub group_id: GroupId,
    pub title: String,
    pub total: Amount,
    pub paid_by: UserId,
    pub participant_ids: Vec<UserId>,
    pub currency: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub notes: String,
}

impl EqualSplit {
    pub fn new(
        group_id: GroupId,
        title: impl Into<String>,
        total: Amount,
        paid_by: UserId,
        participant_ids: Vec<UserId>,
    ) -> Self {
        Self {
            group_id,
            title: title.into(),
            total,
            paid_by,
            participant_ids,
            currency: None,
            created_at: None,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// One participant's explicit share of a custom split
#[derive(Debug, Clone, PartialEq)]
pub struct ShareInput {
    pub user_id: UserId,
    pub amount: Amount,
}

impl ShareInput {
    pub fn new(user_id: UserId, amount: Amount) -> Self {
        Self { user_id, amount }
    }

    pub fn cents(user_id: UserId, cents: i64) -> Self {
        Self::new(user_id, Amount::Cents(cents))
    }
}

/// An itemized bill line supplied with a custom split
#[derive(Debug, Clone, PartialEq)]
pub struct ItemInput {
    pub name: String,
    pub cost: Amount,
    pub assigned_member_ids: Vec<UserId>,
    /// Any further fields, stored verbatim on the item
    pub extra: Map<String, Value>,
}

impl ItemInput {
    pub fn new(name: impl Into<String>, cost: Amount) -> Self {
        Self {
            name: name.into(),
            cost,
            assigned_member_ids: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn assigned_to(mut self, member_ids: Vec<UserId>) -> Self {
        self.assigned_member_ids = member_ids;
        self
    }
}

/// Request to record a bill divided by explicit per-participant amounts
#[derive(Debug, Clone)]
pub struct CustomSplit {
    pub group_id: GroupId,
    pub title: String,
    pub paid_by: UserId,
    pub shares: Vec<ShareInput>,
    pub items: Option<Vec<ItemInput>>,
    pub metadata: Option<Value>,
    pub currency: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub notes: String,
}

impl CustomSplit {
    pub fn new(
        group_id: GroupId,
        title: impl Into<String>,
        paid_by: UserId,
        shares: Vec<ShareInput>,
    ) -> Self {
        Self {
            group_id,
            title: title.into(),
            paid_by,
            shares,
            items: None,
            metadata: None,
            currency: None,
            created_at: None,
            notes: String::new(),
        }
    }

    pub fn with_items(mut self, items: Vec<ItemInput>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Request to record a direct payment between two members
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub group_id: GroupId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Amount,
    pub currency: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub notes: String,
}

impl PaymentRequest {
    pub fn new(
        group_id: GroupId,
        from_user_id: UserId,
        to_user_id: UserId,
        amount: Amount,
    ) -> Self {
        Self {
            group_id,
            from_user_id,
            to_user_id,
            amount,
            currency: None,
            created_at: None,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Net debts of a group as of the last balance update
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBalances {
    pub group_id: GroupId,
    pub edges: Vec<BalanceEdge>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A user's signed position against one counterparty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub counterparty: UserId,
    /// Positive: the counterparty owes the user. Negative: the user owes them.
    pub net_cents: i64,
}

/// Outcome of a balance rebuild
#[derive(Debug, Clone)]
pub struct RebuildSummary {
    pub updated_at: DateTime<Utc>,
    pub events_replayed: usize,
    /// Pairs where the stored projection differed from the replay
    pub corrected: Vec<BalanceDrift>,
}

/// Divide `total_cents` into `parts` shares that differ by at most one cent
///
/// The first `total_cents % parts` shares receive the extra cent.
pub fn equal_shares(total_cents: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let base = total_cents.div_euclid(n);
    let remainder = total_cents.rem_euclid(n);
    (0..n).map(|i| base + i64::from(i < remainder)).collect()
}

/// Debt edges for a bill: every non-payer with a positive share owes the payer
fn debts_for(paid_by: &UserId, shares: &[Share]) -> Vec<Debt> {
    shares
        .iter()
        .filter(|s| &s.user_id != paid_by && s.share_amount_cents > 0)
        .map(|s| Debt::new(s.user_id.clone(), paid_by.clone(), s.share_amount_cents))
        .collect()
}

fn reject_duplicates<'a>(
    ids: impl IntoIterator<Item = &'a UserId>,
    what: &str,
) -> LedgerResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(LedgerError::Validation(format!(
                "{} listed more than once: {}",
                what, id
            )));
        }
    }
    Ok(())
}

/// Net every debt into a copy of the projection, then commit both together
fn append_transaction(
    store: &mut Store,
    txn: Transaction,
    now: DateTime<Utc>,
) -> LedgerResult<Transaction> {
    let mut balances = store.balances.clone();
    for debt in &txn.debts {
        balances.apply_debt(
            &txn.group_id,
            &debt.from_user_id,
            &debt.to_user_id,
            debt.amount_cents,
            now,
        )?;
    }
    store.balances = balances;
    store.transactions.push(txn.clone());
    Ok(txn)
}

/// Record a bill split evenly among `participant_ids`
pub fn record_equal_split(
    store: &mut Store,
    request: EqualSplit,
    now: DateTime<Utc>,
) -> LedgerResult<Transaction> {
    store.require_group(&request.group_id)?;
    store.require_user(&request.paid_by)?;
    if request.participant_ids.is_empty() {
        return Err(LedgerError::InvalidAmount(
            "participant list must not be empty".into(),
        ));
    }
    for user_id in &request.participant_ids {
        store.require_user(user_id)?;
    }
    reject_duplicates(&request.participant_ids, "Participant")?;
    if !request.participant_ids.contains(&request.paid_by) {
        return Err(LedgerError::Validation(format!(
            "Payer {} must be one of the participants",
            request.paid_by
        )));
    }

    let total_cents = request.total.to_minor_units()?;
    if total_cents < 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "total must not be negative: {} cents",
            total_cents
        )));
    }

    let shares: Vec<Share> = request
        .participant_ids
        .iter()
        .zip(equal_shares(total_cents, request.participant_ids.len()))
        .map(|(user_id, cents)| Share::new(user_id.clone(), cents))
        .collect();
    let debts = debts_for(&request.paid_by, &shares);

    let txn = Transaction {
        id: TransactionId::new(),
        group_id: request.group_id,
        title: request.title,
        created_at: request.created_at.unwrap_or(now),
        currency: request
            .currency
            .unwrap_or_else(|| store.currency().to_string()),
        total_amount_cents: total_cents,
        paid_by: request.paid_by,
        split: Split {
            method: SplitMethod::Equal,
            participant_ids: request.participant_ids,
            shares,
            extra: Map::new(),
        },
        debts,
        notes: request.notes,
        items: None,
        metadata: None,
        extra: Map::new(),
    };

    append_transaction(store, txn, now)
}

fn normalize_items(store: &Store, items: Vec<ItemInput>) -> LedgerResult<Vec<BillItem>> {
    items
        .into_iter()
        .map(|item| {
            let name = item.name.trim().to_string();
            if name.is_empty() {
                return Err(LedgerError::Validation("Bill item needs a name".into()));
            }
            let cost_cents = item.cost.to_minor_units()?;
            if cost_cents < 0 {
                return Err(LedgerError::InvalidAmount(format!(
                    "item '{}' has a negative cost",
                    name
                )));
            }
            for user_id in &item.assigned_member_ids {
                store.require_user(user_id)?;
            }
            Ok(BillItem {
                name,
                cost_cents,
                assigned_member_ids: item.assigned_member_ids,
                extra: item.extra,
            })
        })
        .collect()
}

/// Record a bill divided by explicit shares
///
/// The payer always ends up among the participants, with a zero share if
/// none was given.
pub fn record_custom_split(
    store: &mut Store,
    request: CustomSplit,
    now: DateTime<Utc>,
) -> LedgerResult<Transaction> {
    store.require_group(&request.group_id)?;
    store.require_user(&request.paid_by)?;
    for share in &request.shares {
        store.require_user(&share.user_id)?;
    }
    reject_duplicates(request.shares.iter().map(|s| &s.user_id), "Share user")?;

    let mut shares = Vec::with_capacity(request.shares.len() + 1);
    let mut total_cents: i64 = 0;
    for input in &request.shares {
        let cents = input.amount.to_minor_units()?;
        if cents < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "share for {} must not be negative",
                input.user_id
            )));
        }
        total_cents = total_cents
            .checked_add(cents)
            .ok_or_else(|| LedgerError::InvalidAmount("share total out of range".into()))?;
        shares.push(Share::new(input.user_id.clone(), cents));
    }
    if total_cents <= 0 {
        return Err(LedgerError::InvalidAmount(
            "shares must add up to more than zero".into(),
        ));
    }
    if !shares.iter().any(|s| s.user_id == request.paid_by) {
        shares.push(Share::new(request.paid_by.clone(), 0));
    }

    let items = request
        .items
        .map(|items| normalize_items(store, items))
        .transpose()?;

    let participant_ids = shares.iter().map(|s| s.user_id.clone()).collect();
    let debts = debts_for(&request.paid_by, &shares);

    let txn = Transaction {
        id: TransactionId::new(),
        group_id: request.group_id,
        title: request.title,
        created_at: request.created_at.unwrap_or(now),
        currency: request
            .currency
            .unwrap_or_else(|| store.currency().to_string()),
        total_amount_cents: total_cents,
        paid_by: request.paid_by,
        split: Split {
            method: SplitMethod::Custom,
            participant_ids,
            shares,
            extra: Map::new(),
        },
        debts,
        notes: request.notes,
        items,
        metadata: request.metadata,
        extra: Map::new(),
    };

    append_transaction(store, txn, now)
}

/// Record a payment, reducing what `from` owes `to`
///
/// Paying more than is owed flips the debt to the other direction. A payment
/// that would push either graph out of range fails before anything is
/// written.
pub fn record_payment(
    store: &mut Store,
    request: PaymentRequest,
    now: DateTime<Utc>,
) -> LedgerResult<Payment> {
    store.require_group(&request.group_id)?;
    store.require_user(&request.from_user_id)?;
    store.require_user(&request.to_user_id)?;
    if request.from_user_id == request.to_user_id {
        return Err(LedgerError::Validation(
            "Payment sender and recipient must differ".into(),
        ));
    }

    let amount_cents = request.amount.to_minor_units()?;
    if amount_cents <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "payment must be greater than zero, got {} cents",
            amount_cents
        )));
    }

    let payment = Payment {
        id: PaymentId::new(),
        group_id: request.group_id,
        created_at: request.created_at.unwrap_or(now),
        currency: request
            .currency
            .unwrap_or_else(|| store.currency().to_string()),
        from_user_id: request.from_user_id,
        to_user_id: request.to_user_id,
        amount_cents,
        notes: request.notes,
        extra: Map::new(),
    };

    store.balances.apply_debt(
        &payment.group_id,
        &payment.from_user_id,
        &payment.to_user_id,
        -amount_cents,
        now,
    )?;
    store.payments.push(payment.clone());
    Ok(payment)
}

/// Current net debts of a group
pub fn group_balances(store: &Store, group_id: &GroupId) -> LedgerResult<GroupBalances> {
    store.require_group(group_id)?;
    let edges = store
        .balances
        .group(group_id)
        .map(|net| net.edges())
        .unwrap_or_default();

    Ok(GroupBalances {
        group_id: group_id.clone(),
        edges,
        updated_at: store.balances.updated_at,
    })
}

/// Recompute the balance projection from the event log
///
/// Every transaction's debts are replayed in append order, then every
/// payment's inverse. Unknown fields of the current projection are kept.
pub fn replay_balances(store: &Store, now: DateTime<Utc>) -> LedgerResult<Balances> {
    let mut balances = Balances {
        extra: store.balances.extra.clone(),
        ..Balances::default()
    };
    for group in &store.groups {
        balances.ensure_group(&group.id);
    }

    for txn in &store.transactions {
        balances.ensure_group(&txn.group_id);
        for debt in &txn.debts {
            balances.apply_debt(
                &txn.group_id,
                &debt.from_user_id,
                &debt.to_user_id,
                debt.amount_cents,
                now,
            )?;
        }
    }
    for payment in &store.payments {
        let inverse = payment.amount_cents.checked_neg().ok_or_else(|| {
            LedgerError::InvalidAmount(format!("payment {} is out of range", payment.id))
        })?;
        balances.apply_debt(
            &payment.group_id,
            &payment.from_user_id,
            &payment.to_user_id,
            inverse,
            now,
        )?;
    }

    balances.updated_at = Some(now);
    Ok(balances)
}

/// Replace the stored projection with a full replay of the event log
pub fn rebuild_balances(store: &mut Store, now: DateTime<Utc>) -> LedgerResult<RebuildSummary> {
    let rebuilt = replay_balances(store, now)?;
    let corrected = store.balances.drift_from(&rebuilt);
    store.balances = rebuilt;

    Ok(RebuildSummary {
        updated_at: now,
        events_replayed: store.transactions.len() + store.payments.len(),
        corrected,
    })
}

/// A user's net position against everyone they share debts with
pub fn user_position(store: &Store, user_id: &UserId) -> LedgerResult<Vec<Position>> {
    store.require_user(user_id)?;
    Ok(store
        .balances
        .global
        .net
        .position_of(user_id)
        .into_iter()
        .map(|(counterparty, net_cents)| Position {
            counterparty,
            net_cents,
        })
        .collect())
}

/// Transactions and payments of a group in append order
pub fn group_history(
    store: &Store,
    group_id: &GroupId,
) -> LedgerResult<(Vec<Transaction>, Vec<Payment>)> {
    store.require_group(group_id)?;
    let transactions = store
        .transactions
        .iter()
        .filter(|t| &t.group_id == group_id)
        .cloned()
        .collect();
    let payments = store
        .payments
        .iter()
        .filter(|p| &p.group_id == group_id)
        .cloned()
        .collect();
    Ok((transactions, payments))
}

/// Service for recording ledger events against a stored document
pub struct LedgerService<'a, R: StoreRepository> {
    repo: &'a R,
    audit: Option<&'a AuditLogger>,
}

impl<'a, R: StoreRepository> LedgerService<'a, R> {
    /// Create a new ledger service
    pub fn new(repo: &'a R) -> Self {
        Self { repo, audit: None }
    }

    /// Record every event in an audit log as well
    pub fn with_audit(mut self, audit: &'a AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    fn log_transaction(&self, txn: &Transaction) {
        info!(
            transaction_id = %txn.id,
            group_id = %txn.group_id,
            method = %txn.split.method,
            total_cents = txn.total_amount_cents,
            debts = txn.debts.len(),
            "Recorded transaction"
        );
        record_audit(self.audit, AuditEntry::bill_recorded(txn));
    }

    /// Record an equal split and persist it
    pub fn record_equal_split(&self, request: EqualSplit) -> LedgerResult<Transaction> {
        let mut store = self.repo.load()?;
        let txn = record_equal_split(&mut store, request, Utc::now())?;
        self.repo.save(&store)?;
        self.log_transaction(&txn);
        Ok(txn)
    }

    /// Record a custom split and persist it
    pub fn record_custom_split(&self, request: CustomSplit) -> LedgerResult<Transaction> {
        let mut store = self.repo.load()?;
        let txn = record_custom_split(&mut store, request, Utc::now())?;
        self.repo.save(&store)?;
        self.log_transaction(&txn);
        Ok(txn)
    }

    /// Allocate an itemized bill and record it as a custom split
    pub fn record_bill(
        &self,
        group_id: &GroupId,
        title: &str,
        paid_by: &UserId,
        bill: &BillInput,
    ) -> LedgerResult<Transaction> {
        let mut store = self.repo.load()?;
        let allocation = allocate_bill(&store, group_id, bill)?;

        let metadata = json!({
            "source": "bill",
            "item_count": allocation.items.len(),
        });
        let request = CustomSplit::new(group_id.clone(), title, paid_by.clone(), allocation.shares)
            .with_items(allocation.items)
            .with_metadata(metadata);

        let txn = record_custom_split(&mut store, request, Utc::now())?;
        self.repo.save(&store)?;
        self.log_transaction(&txn);
        Ok(txn)
    }

    /// Record a payment and persist it
    pub fn record_payment(&self, request: PaymentRequest) -> LedgerResult<Payment> {
        let mut store = self.repo.load()?;
        let payment = record_payment(&mut store, request, Utc::now())?;
        self.repo.save(&store)?;

        info!(
            payment_id = %payment.id,
            group_id = %payment.group_id,
            amount_cents = payment.amount_cents,
            "Recorded payment"
        );
        record_audit(self.audit, AuditEntry::payment_recorded(&payment));
        Ok(payment)
    }

    /// Current net debts of a group
    pub fn get_group_balances(&self, group_id: &GroupId) -> LedgerResult<GroupBalances> {
        group_balances(&self.repo.load()?, group_id)
    }

    /// Every netted debt across all groups
    pub fn global_balances(&self) -> LedgerResult<Vec<BalanceEdge>> {
        Ok(self.repo.load()?.balances.global.net.edges())
    }

    /// Rebuild the balance projection from history and persist it
    pub fn rebuild_balances(&self) -> LedgerResult<RebuildSummary> {
        let mut store = self.repo.load()?;
        let before = store.balances.clone();
        let summary = rebuild_balances(&mut store, Utc::now())?;
        self.repo.save(&store)?;

        if summary.corrected.is_empty() {
            info!(events = summary.events_replayed, "Rebuilt balances");
        } else {
            warn!(
                events = summary.events_replayed,
                corrected = summary.corrected.len(),
                "Rebuilt balances; stored projection had drifted"
            );
        }

        if self.audit.is_some() {
            let (before_json, after_json) = (
                serde_json::to_value(&before).unwrap_or(Value::Null),
                serde_json::to_value(&store.balances).unwrap_or(Value::Null),
            );
            let changes = generate_detailed_diff(&before_json, &after_json, "balances");
            record_audit(
                self.audit,
                AuditEntry::balances_rebuilt(summary.corrected.len(), changes),
            );
        }
        Ok(summary)
    }

    /// Compare the stored projection against a replay without saving
    pub fn verify_balances(&self) -> LedgerResult<Vec<BalanceDrift>> {
        let store = self.repo.load()?;
        let expected = replay_balances(&store, Utc::now())?;
        Ok(store.balances.drift_from(&expected))
    }

    /// A user's net position against each counterparty, across groups
    pub fn user_position(&self, user_id: &UserId) -> LedgerResult<Vec<Position>> {
        user_position(&self.repo.load()?, user_id)
    }

    /// Transactions and payments of a group in append order
    pub fn group_history(
        &self,
        group_id: &GroupId,
    ) -> LedgerResult<(Vec<Transaction>, Vec<Payment>)> {
        group_history(&self.repo.load()?, group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::{create_group, upsert_user};
    use crate::storage::{JsonStoreRepository, MemoryStoreRepository};
    use rust_decimal_macros::dec;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        store: Store,
        group: GroupId,
        a: UserId,
        b: UserId,
        c: UserId,
    }

    fn fixture() -> Fixture {
        let mut store = Store::default();
        let (a, _) = upsert_user(&mut store, "Amir").unwrap();
        let (b, _) = upsert_user(&mut store, "Logan").unwrap();
        let (c, _) = upsert_user(&mut store, "Levi").unwrap();
        let group = create_group(
            &mut store,
            "RT_DEV",
            &[a.clone(), b.clone(), c.clone()],
            Utc::now(),
        )
        .unwrap();
        Fixture { store, group, a, b, c }
    }

    fn edge(store: &Store, group: &GroupId, from: &UserId, to: &UserId) -> i64 {
        store.balances.group(group).unwrap().edge(from, to)
    }

    #[test]
    fn test_equal_shares_distribution() {
        assert_eq!(equal_shares(1000, 3), vec![334, 333, 333]);
        assert_eq!(equal_shares(1001, 3), vec![334, 334, 333]);
        assert_eq!(equal_shares(2, 3), vec![1, 1, 0]);
        assert_eq!(equal_shares(0, 2), vec![0, 0]);
        assert!(equal_shares(10, 0).is_empty());
    }

    #[test]
    fn test_equal_split_remainder_goes_to_first_participants() {
        let Fixture { mut store, group, a, b, c } = fixture();
        let request = EqualSplit::new(
            group.clone(),
            "Groceries",
            Amount::Cents(1000),
            a.clone(),
            vec![a.clone(), b.clone(), c.clone()],
        );

        let txn = record_equal_split(&mut store, request, Utc::now()).unwrap();

        let shares: Vec<i64> = txn.split.shares.iter().map(|s| s.share_amount_cents).collect();
        assert_eq!(shares, vec![334, 333, 333]);
        assert_eq!(txn.debts.len(), 2);
        assert!(txn.debts.iter().all(|d| d.to_user_id == a));
        assert!(txn.is_balanced());
        assert_eq!(txn.currency, "CAD");

        assert_eq!(edge(&store, &group, &b, &a), 333);
        assert_eq!(edge(&store, &group, &c, &a), 333);
        assert_eq!(store.balances.global.net.edge(&b, &a), 333);
    }

    #[test]
    fn test_equal_split_from_decimal_total() {
        let Fixture { mut store, group, a, b, .. } = fixture();
        let recorded_at = Utc::now() - chrono::Duration::days(2);
        let request = EqualSplit::new(
            group,
            "Taxi",
            Amount::Decimal(dec!(10.005)),
            b.clone(),
            vec![a.clone(), b.clone()],
        )
        .with_currency("USD")
        .with_created_at(recorded_at);

        let txn = record_equal_split(&mut store, request, Utc::now()).unwrap();
        assert_eq!(txn.created_at, recorded_at);
        assert_eq!(txn.currency, "USD");
        assert_eq!(txn.total_amount_cents, 1001);
        assert_eq!(txn.share_of(&a), 501);
        assert_eq!(txn.debt_total(), 501);
    }

    #[test]
    fn test_equal_split_validation() {
        let Fixture { mut store, group, a, b, .. } = fixture();

        let empty = EqualSplit::new(group.clone(), "x", Amount::Cents(100), a.clone(), vec![]);
        assert!(matches!(
            record_equal_split(&mut store, empty, Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));

        let payer_missing =
            EqualSplit::new(group.clone(), "x", Amount::Cents(100), a.clone(), vec![b.clone()]);
        assert!(matches!(
            record_equal_split(&mut store, payer_missing, Utc::now()),
            Err(LedgerError::Validation(_))
        ));

        let duplicate = EqualSplit::new(
            group.clone(),
            "x",
            Amount::Cents(100),
            a.clone(),
            vec![a.clone(), a.clone()],
        );
        assert!(matches!(
            record_equal_split(&mut store, duplicate, Utc::now()),
            Err(LedgerError::Validation(_))
        ));

        let unknown = EqualSplit::new(
            group.clone(),
            "x",
            Amount::Cents(100),
            a.clone(),
            vec![a.clone(), UserId::from("u_ghost")],
        );
        assert!(matches!(
            record_equal_split(&mut store, unknown, Utc::now()),
            Err(LedgerError::UnknownUser(_))
        ));

        let negative =
            EqualSplit::new(group.clone(), "x", Amount::Cents(-5), a.clone(), vec![a.clone()]);
        assert!(matches!(
            record_equal_split(&mut store, negative, Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));

        let no_group =
            EqualSplit::new(GroupId::from("g_none"), "x", Amount::Cents(1), a.clone(), vec![a]);
        assert!(matches!(
            record_equal_split(&mut store, no_group, Utc::now()),
            Err(LedgerError::UnknownGroup(_))
        ));

        assert!(store.transactions.is_empty());
        assert!(store.balances.global.net.is_empty());
    }

    #[test]
    fn test_custom_split_appends_payer_share() {
        let Fixture { mut store, group, a, b, c } = fixture();
        let request = CustomSplit::new(
            group.clone(),
            "Concert",
            a.clone(),
            vec![
                ShareInput::cents(b.clone(), 4000),
                ShareInput::new(c.clone(), Amount::Decimal(dec!(25.50))),
            ],
        );

        let txn = record_custom_split(&mut store, request, Utc::now()).unwrap();

        assert_eq!(txn.total_amount_cents, 6550);
        assert_eq!(txn.split.method, SplitMethod::Custom);
        assert_eq!(txn.split.participant_ids, vec![b.clone(), c.clone(), a.clone()]);
        assert_eq!(txn.share_of(&a), 0);
        assert_eq!(txn.debt_total(), 6550);
        assert!(txn.is_balanced());
        assert_eq!(edge(&store, &group, &c, &a), 2550);
    }

    #[test]
    fn test_custom_split_payer_never_owes_themselves() {
        let Fixture { mut store, group, a, b, .. } = fixture();
        let request = CustomSplit::new(
            group,
            "Lunch",
            a.clone(),
            vec![ShareInput::cents(a.clone(), 1200), ShareInput::cents(b.clone(), 800)],
        );

        let txn = record_custom_split(&mut store, request, Utc::now()).unwrap();
        assert_eq!(txn.debts.len(), 1);
        assert_eq!(txn.debts[0].from_user_id, b);
        assert_eq!(txn.debt_total() + txn.share_of(&a), txn.total_amount_cents);
    }

    #[test]
    fn test_custom_split_validation() {
        let Fixture { mut store, group, a, b, .. } = fixture();

        let zero =
            CustomSplit::new(group.clone(), "x", a.clone(), vec![ShareInput::cents(b.clone(), 0)]);
        assert!(matches!(
            record_custom_split(&mut store, zero, Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));

        let negative = CustomSplit::new(
            group.clone(),
            "x",
            a.clone(),
            vec![ShareInput::cents(b.clone(), 500), ShareInput::cents(a.clone(), -1)],
        );
        assert!(matches!(
            record_custom_split(&mut store, negative, Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));

        let unknown = CustomSplit::new(
            group.clone(),
            "x",
            a.clone(),
            vec![ShareInput::cents(UserId::from("u_ghost"), 500)],
        );
        assert!(matches!(
            record_custom_split(&mut store, unknown, Utc::now()),
            Err(LedgerError::UnknownUser(_))
        ));

        let bad_item = CustomSplit::new(group, "x", a, vec![ShareInput::cents(b.clone(), 500)])
            .with_items(vec![ItemInput::new("Wine", Amount::Cents(500))
                .assigned_to(vec![UserId::from("u_ghost")])]);
        assert!(matches!(
            record_custom_split(&mut store, bad_item, Utc::now()),
            Err(LedgerError::UnknownUser(_))
        ));

        assert!(store.transactions.is_empty());
    }

    #[test]
    fn test_custom_split_keeps_item_extras() {
        let Fixture { mut store, group, a, b, .. } = fixture();
        let mut item =
            ItemInput::new(" Nachos ", Amount::Decimal(dec!(12.99))).assigned_to(vec![b.clone()]);
        item.extra.insert("source_line".into(), json!(4));

        let request = CustomSplit::new(group, "Bar", a, vec![ShareInput::cents(b, 1299)])
            .with_items(vec![item])
            .with_metadata(json!({"parser": "manual"}));
        let txn = record_custom_split(&mut store, request, Utc::now()).unwrap();

        let items = txn.items.as_ref().unwrap();
        assert_eq!(items[0].name, "Nachos");
        assert_eq!(items[0].cost_cents, 1299);
        assert_eq!(items[0].extra.get("source_line"), Some(&json!(4)));
        assert_eq!(txn.metadata, Some(json!({"parser": "manual"})));
    }

    #[test]
    fn test_payment_reduces_and_flips_debt() {
        let Fixture { mut store, group, a, b, .. } = fixture();
        store
            .balances
            .apply_debt(&group, &a, &b, 500, Utc::now())
            .unwrap();

        let mut partial = store.clone();
        record_payment(
            &mut partial,
            PaymentRequest::new(group.clone(), a.clone(), b.clone(), Amount::Cents(300)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(edge(&partial, &group, &a, &b), 200);
        assert_eq!(edge(&partial, &group, &b, &a), 0);

        record_payment(
            &mut store,
            PaymentRequest::new(group.clone(), a.clone(), b.clone(), Amount::Cents(600)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(edge(&store, &group, &a, &b), 0);
        assert_eq!(edge(&store, &group, &b, &a), 100);
        assert_eq!(store.balances.global.net.edge(&b, &a), 100);
    }

    #[test]
    fn test_payment_validation() {
        let Fixture { mut store, group, a, b, .. } = fixture();

        for amount in [Amount::Cents(0), Amount::Cents(-100), Amount::Decimal(dec!(0.004))] {
            let request = PaymentRequest::new(group.clone(), a.clone(), b.clone(), amount);
            assert!(matches!(
                record_payment(&mut store, request, Utc::now()),
                Err(LedgerError::InvalidAmount(_))
            ));
        }

        let to_self = PaymentRequest::new(group.clone(), a.clone(), a.clone(), Amount::Cents(10));
        assert!(matches!(
            record_payment(&mut store, to_self, Utc::now()),
            Err(LedgerError::Validation(_))
        ));

        let unknown = PaymentRequest::new(group, UserId::from("u_ghost"), b, Amount::Cents(10));
        assert!(matches!(
            record_payment(&mut store, unknown, Utc::now()),
            Err(LedgerError::UnknownUser(_))
        ));
        assert!(store.payments.is_empty());
    }

    #[test]
    fn test_payment_overflow_leaves_store_unchanged() {
        let Fixture { mut store, group, a, b, .. } = fixture();
        record_payment(
            &mut store,
            PaymentRequest::new(group.clone(), a.clone(), b.clone(), Amount::Cents(i64::MAX)),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(edge(&store, &group, &b, &a), i64::MAX);
        let before = store.clone();

        let err = record_payment(
            &mut store,
            PaymentRequest::new(group, a, b, Amount::Cents(1)),
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(store, before);
    }

    #[test]
    fn test_split_overflow_commits_no_debt() {
        let Fixture { mut store, group, a, b, c } = fixture();
        store
            .balances
            .apply_debt(&group, &c, &a, i64::MAX, Utc::now())
            .unwrap();
        let before = store.clone();

        // b's debt fits, c's does not
        let request = CustomSplit::new(
            group,
            "Rent",
            a,
            vec![ShareInput::cents(b, 500), ShareInput::cents(c, 1)],
        );
        let err = record_custom_split(&mut store, request, Utc::now()).unwrap_err();

        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(store, before);
    }

    #[test]
    fn test_replay_rejects_out_of_range_history() {
        let Fixture { mut store, group, a, b, .. } = fixture();
        for _ in 0..2 {
            record_payment(
                &mut store,
                PaymentRequest::new(group.clone(), a.clone(), b.clone(), Amount::Cents(1)),
                Utc::now(),
            )
            .unwrap();
        }
        store.payments[0].amount_cents = i64::MAX;
        store.payments[1].amount_cents = i64::MAX;

        assert!(matches!(
            replay_balances(&store, Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));
        let before = store.clone();
        assert!(rebuild_balances(&mut store, Utc::now()).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let Fixture { mut store, group, a, b, c } = fixture();
        let now = Utc::now();
        record_equal_split(
            &mut store,
            EqualSplit::new(
                group.clone(),
                "Dinner",
                Amount::Cents(9001),
                a.clone(),
                vec![a.clone(), b.clone(), c.clone()],
            ),
            now,
        )
        .unwrap();
        record_payment(
            &mut store,
            PaymentRequest::new(group.clone(), b.clone(), a.clone(), Amount::Cents(5000)),
            now,
        )
        .unwrap();
        record_custom_split(
            &mut store,
            CustomSplit::new(
                group.clone(),
                "Tickets",
                c.clone(),
                vec![ShareInput::cents(a.clone(), 700)],
            ),
            now,
        )
        .unwrap();

        let incremental = store.balances.clone();
        let summary = rebuild_balances(&mut store, now).unwrap();

        assert!(summary.corrected.is_empty());
        assert_eq!(summary.events_replayed, 3);
        assert_eq!(store.balances.global.net, incremental.global.net);
        assert_eq!(store.balances.group(&group), incremental.group(&group));
    }

    #[test]
    fn test_rebuild_repairs_tampered_projection() {
        let Fixture { mut store, group, a, b, .. } = fixture();
        record_payment(
            &mut store,
            PaymentRequest::new(group.clone(), a.clone(), b.clone(), Amount::Cents(250)),
            Utc::now(),
        )
        .unwrap();
        store.balances.clear();

        let summary = rebuild_balances(&mut store, Utc::now()).unwrap();
        assert_eq!(summary.corrected.len(), 2);
        assert_eq!(edge(&store, &group, &b, &a), 250);
    }

    #[test]
    fn test_group_balances_and_positions() {
        let Fixture { mut store, group, a, b, c } = fixture();
        record_equal_split(
            &mut store,
            EqualSplit::new(
                group.clone(),
                "Dinner",
                Amount::Cents(900),
                a.clone(),
                vec![a.clone(), b.clone(), c.clone()],
            ),
            Utc::now(),
        )
        .unwrap();

        let balances = group_balances(&store, &group).unwrap();
        assert_eq!(balances.edges.len(), 2);
        assert_eq!(balances.updated_at, store.balances.updated_at);
        assert!(group_balances(&store, &GroupId::from("g_none")).is_err());

        let positions = user_position(&store, &a).unwrap();
        assert_eq!(positions.len(), 2);
        assert!(positions.iter().all(|p| p.net_cents == 300));

        let (txns, payments) = group_history(&store, &group).unwrap();
        assert_eq!(txns.len(), 1);
        assert!(payments.is_empty());
    }

    #[test]
    fn test_service_persists_each_event() {
        let temp_dir = TempDir::new().unwrap();
        let repo = JsonStoreRepository::new(temp_dir.path().join("store.json"));
        let Fixture { store, group, a, b, .. } = fixture();
        repo.save(&store).unwrap();

        let service = LedgerService::new(&repo);
        service
            .record_equal_split(EqualSplit::new(
                group.clone(),
                "Coffee",
                Amount::Cents(800),
                a.clone(),
                vec![a.clone(), b.clone()],
            ))
            .unwrap();
        service
            .record_payment(PaymentRequest::new(
                group.clone(),
                b.clone(),
                a.clone(),
                Amount::Cents(100),
            ))
            .unwrap();

        let reloaded = repo.load().unwrap();
        assert_eq!(reloaded.transactions.len(), 1);
        assert_eq!(reloaded.payments.len(), 1);

        let balances = service.get_group_balances(&group).unwrap();
        assert_eq!(balances.edges[0].amount_cents, 300);
        assert!(service.verify_balances().unwrap().is_empty());
    }

    #[test]
    fn test_failed_payment_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        let repo = JsonStoreRepository::new(&path);
        let Fixture { store, group, b, .. } = fixture();
        repo.save(&store).unwrap();
        let before = fs::read(&path).unwrap();

        let service = LedgerService::new(&repo);
        let err = service
            .record_payment(PaymentRequest::new(
                group,
                UserId::from("u_ghost"),
                b,
                Amount::Cents(100),
            ))
            .unwrap_err();

        assert!(matches!(err, LedgerError::UnknownUser(_)));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_service_rebuild_audits_changes() {
        let temp_dir = TempDir::new().unwrap();
        let Fixture { mut store, group, a, b, .. } = fixture();
        record_payment(
            &mut store,
            PaymentRequest::new(group, a, b, Amount::Cents(75)),
            Utc::now(),
        )
        .unwrap();
        store.balances.clear();
        let repo = MemoryStoreRepository::with_store(&store).unwrap();
        let audit = AuditLogger::new(temp_dir.path().join("audit.log"));

        LedgerService::new(&repo)
            .with_audit(&audit)
            .rebuild_balances()
            .unwrap();

        let entries = audit.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, crate::audit::AuditAction::BalancesRebuilt);
        assert_eq!(entries[0].label.as_deref(), Some("2 pairs corrected"));
        assert!(!entries[0].changes.is_empty());
    }

    #[test]
    fn test_service_rebuild_reports_drift() {
        let Fixture { mut store, group, a, b, .. } = fixture();
        record_payment(
            &mut store,
            PaymentRequest::new(group, a, b, Amount::Cents(75)),
            Utc::now(),
        )
        .unwrap();
        store.balances.global.net = Default::default();
        let repo = MemoryStoreRepository::with_store(&store).unwrap();

        let service = LedgerService::new(&repo);
        assert_eq!(service.verify_balances().unwrap().len(), 1);

        let summary = service.rebuild_balances().unwrap();
        assert_eq!(summary.corrected.len(), 1);
        assert!(service.verify_balances().unwrap().is_empty());
    }
}

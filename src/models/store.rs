//! The ledger document
//!
//! A single JSON document holds every user, group, transaction and payment,
//! plus the balance projection derived from them. Unknown fields anywhere in
//! the document are carried through a load/save cycle untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::balance::Balances;
use super::ids::{GroupId, UserId};
use super::transaction::{Payment, Transaction};
use super::user::{Group, User};
use crate::error::{LedgerError, LedgerResult};

/// Schema version written by this crate
pub const SCHEMA_VERSION: u32 = 1;

/// Currency used when a store is created without one
pub const DEFAULT_CURRENCY: &str = "CAD";

/// Application-wide settings stored inside the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_currency")]
    pub currency_default: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            currency_default: default_currency(),
            extra: Map::new(),
        }
    }
}

/// Root ledger document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub app: AppSection,

    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub groups: Vec<Group>,

    #[serde(default)]
    pub transactions: Vec<Transaction>,

    #[serde(default)]
    pub payments: Vec<Payment>,

    #[serde(default)]
    pub balances: Balances,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            app: AppSection::default(),
            users: Vec::new(),
            groups: Vec::new(),
            transactions: Vec::new(),
            payments: Vec::new(),
            balances: Balances::default(),
            extra: Map::new(),
        }
    }
}

impl Store {
    /// Create an empty store with a specific default currency
    pub fn with_currency(currency: impl Into<String>) -> Self {
        let mut store = Self::default();
        store.app.currency_default = currency.into();
        store
    }

    /// Default currency for new records
    pub fn currency(&self) -> &str {
        &self.app.currency_default
    }

    pub fn user(&self, user_id: &UserId) -> Option<&User> {
        self.users.iter().find(|u| &u.id == user_id)
    }

    pub fn group(&self, group_id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| &g.id == group_id)
    }

    pub fn group_mut(&mut self, group_id: &GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| &g.id == group_id)
    }

    /// Find a user by exact, case-sensitive display name
    pub fn find_user_by_name(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name)
    }

    /// Find a group by exact display name (first match)
    pub fn find_group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Fail with `UnknownUser` unless the user is registered
    pub fn require_user(&self, user_id: &UserId) -> LedgerResult<&User> {
        self.user(user_id)
            .ok_or_else(|| LedgerError::unknown_user(user_id.as_str()))
    }

    /// Fail with `UnknownGroup` unless the group exists
    pub fn require_group(&self, group_id: &GroupId) -> LedgerResult<&Group> {
        self.group(group_id)
            .ok_or_else(|| LedgerError::unknown_group(group_id.as_str()))
    }

    /// Display name for a user id, falling back to the id itself
    pub fn display_name(&self, user_id: &UserId) -> String {
        self.user(user_id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    /// Structural checks beyond what the JSON schema enforces
    ///
    /// Returns a description of the first problem found.
    pub fn check_integrity(&self) -> Result<(), String> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(format!(
                "unsupported schema_version {} (expected {})",
                self.schema_version, SCHEMA_VERSION
            ));
        }

        let scopes = std::iter::once(("global".to_string(), &self.balances.global.net)).chain(
            self.balances
                .by_group
                .iter()
                .map(|(id, g)| (format!("group {}", id), &g.net)),
        );
        for (scope, net) in scopes {
            if let Some(edge) = net.edges().into_iter().find(|e| e.amount_cents <= 0) {
                return Err(format!(
                    "non-positive {} balance {} -> {}: {}",
                    scope, edge.from_user_id, edge.to_user_id, edge.amount_cents
                ));
            }
        }

        self.transactions.iter().try_for_each(check_transaction)?;
        self.payments.iter().try_for_each(check_payment)
    }
}

/// A stored bill must carry the same amounts the ledger would have recorded
fn check_transaction(txn: &Transaction) -> Result<(), String> {
    if txn.total_amount_cents < 0 || txn.split.shares.iter().any(|s| s.share_amount_cents < 0) {
        return Err(format!("transaction {} has a negative amount", txn.id));
    }

    let bad_debt = txn.debts.iter().find(|d| {
        d.amount_cents <= 0 || d.from_user_id == txn.paid_by || d.to_user_id != txn.paid_by
    });
    if let Some(debt) = bad_debt {
        return Err(format!(
            "transaction {} has an invalid debt {} -> {}: {}",
            txn.id, debt.from_user_id, debt.to_user_id, debt.amount_cents
        ));
    }

    if !txn.is_balanced() {
        return Err(format!(
            "transaction {} does not balance: debts and shares disagree with the total",
            txn.id
        ));
    }
    Ok(())
}

fn check_payment(payment: &Payment) -> Result<(), String> {
    if payment.amount_cents <= 0 {
        return Err(format!(
            "payment {} has non-positive amount {}",
            payment.id, payment.amount_cents
        ));
    }
    if payment.from_user_id == payment.to_user_id {
        return Err(format!(
            "payment {} is from {} to themselves",
            payment.id, payment.from_user_id
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_store_shape() {
        let value = serde_json::to_value(Store::default()).unwrap();
        assert_eq!(value["schema_version"], json!(1));
        assert_eq!(value["app"]["currency_default"], json!("CAD"));
        assert_eq!(value["users"], json!([]));
        assert_eq!(value["balances"]["updated_at"], Value::Null);
        assert_eq!(value["balances"]["by_group"], json!({}));
        assert_eq!(value["balances"]["global"], json!({"net": {}}));
    }

    #[test]
    fn test_unknown_top_level_fields_preserved() {
        let raw = json!({
            "schema_version": 1,
            "app": {"currency_default": "USD", "theme": "dark"},
            "users": [],
            "groups": [],
            "transactions": [],
            "payments": [],
            "balances": {"updated_at": null, "by_group": {}, "global": {"net": {}}},
            "profiles": {"last": "Amir"}
        });
        let store: Store = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(store.currency(), "USD");
        assert_eq!(serde_json::to_value(&store).unwrap(), raw);
    }

    #[test]
    fn test_lookups() {
        let mut store = Store::default();
        let user = User::new("Amir");
        let user_id = user.id.clone();
        store.users.push(user);

        assert!(store.require_user(&user_id).is_ok());
        assert_eq!(store.find_user_by_name("Amir").unwrap().id, user_id);
        assert!(store.find_user_by_name("amir").is_none());
        assert_eq!(store.display_name(&user_id), "Amir");
        assert_eq!(store.display_name(&UserId::from("u_gone")), "u_gone");

        let err = store.require_group(&GroupId::from("g_x")).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownGroup(_)));
    }

    #[test]
    fn test_integrity_rejects_other_schema_versions() {
        let mut store = Store::default();
        assert!(store.check_integrity().is_ok());
        store.schema_version = 2;
        assert!(store.check_integrity().is_err());
    }

    #[test]
    fn test_integrity_rejects_explicit_zero_balances() {
        let store: Store = serde_json::from_value(json!({
            "schema_version": 1,
            "balances": {"global": {"net": {"u_a": {"u_b": 0}}}}
        }))
        .unwrap();
        let err = store.check_integrity().unwrap_err();
        assert!(err.contains("non-positive"));
    }

    #[test]
    fn test_integrity_checks_event_log() {
        let mut store = crate::export::sample_store();
        assert!(store.check_integrity().is_ok());

        let mut reversed = store.clone();
        let debt = &mut reversed.transactions[0].debts[0];
        std::mem::swap(&mut debt.from_user_id, &mut debt.to_user_id);
        assert!(reversed.check_integrity().unwrap_err().contains("invalid debt"));

        let mut inflated = store.clone();
        inflated.transactions[0].debts[0].amount_cents += 1;
        assert!(inflated.check_integrity().unwrap_err().contains("does not balance"));

        let txn = &store.transactions[0];
        let payment = Payment {
            id: crate::models::PaymentId::from("p_1"),
            group_id: txn.group_id.clone(),
            created_at: txn.created_at,
            currency: txn.currency.clone(),
            from_user_id: txn.paid_by.clone(),
            to_user_id: txn.paid_by.clone(),
            amount_cents: 100,
            notes: String::new(),
            extra: Map::new(),
        };
        store.payments.push(payment);
        assert!(store.check_integrity().unwrap_err().contains("themselves"));

        store.payments[0].to_user_id = txn.debts[0].from_user_id.clone();
        assert!(store.check_integrity().is_ok());
        store.payments[0].amount_cents = i64::MIN;
        assert!(store.check_integrity().unwrap_err().contains("non-positive"));
    }
}

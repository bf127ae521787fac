//! Audit entries for ledger events
//!
//! The ledger is append-only: every entry names one event, the record it
//! produced and the group it happened in. Bills and payments carry their
//! amount so the log can be read without the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Group, GroupId, Money, Payment, Transaction, User, UserId};

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserAdded,
    GroupCreated,
    MemberAdded,
    BillRecorded,
    PaymentRecorded,
    BalancesRebuilt,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::UserAdded => "user added",
            Self::GroupCreated => "group created",
            Self::MemberAdded => "member added",
            Self::BillRecorded => "bill recorded",
            Self::PaymentRecorded => "payment recorded",
            Self::BalancesRebuilt => "balances rebuilt",
        };
        f.write_str(text)
    }
}

/// One line of the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,

    /// Id of the user, group, transaction or payment; `balances` for rebuilds
    pub record_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,

    /// User name, group name, bill title or payment direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// The record as stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,

    /// Dotted-path changes to the balance projection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
}

impl AuditEntry {
    fn new(action: AuditAction, record_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            record_id: record_id.into(),
            group_id: None,
            label: None,
            amount_cents: None,
            currency: None,
            record: None,
            changes: Vec::new(),
        }
    }

    pub fn user_added(user: &User) -> Self {
        Self {
            label: Some(user.name.clone()),
            record: serde_json::to_value(user).ok(),
            ..Self::new(AuditAction::UserAdded, user.id.as_str())
        }
    }

    pub fn group_created(group: &Group) -> Self {
        Self {
            group_id: Some(group.id.clone()),
            label: Some(group.name.clone()),
            record: serde_json::to_value(group).ok(),
            ..Self::new(AuditAction::GroupCreated, group.id.as_str())
        }
    }

    pub fn member_added(group_id: &GroupId, user_id: &UserId, name: &str) -> Self {
        Self {
            group_id: Some(group_id.clone()),
            label: Some(name.to_string()),
            ..Self::new(AuditAction::MemberAdded, user_id.as_str())
        }
    }

    pub fn bill_recorded(txn: &Transaction) -> Self {
        Self {
            group_id: Some(txn.group_id.clone()),
            label: Some(txn.title.clone()),
            amount_cents: Some(txn.total_amount_cents),
            currency: Some(txn.currency.clone()),
            record: serde_json::to_value(txn).ok(),
            ..Self::new(AuditAction::BillRecorded, txn.id.as_str())
        }
    }

    pub fn payment_recorded(payment: &Payment) -> Self {
        Self {
            group_id: Some(payment.group_id.clone()),
            label: Some(format!("{} -> {}", payment.from_user_id, payment.to_user_id)),
            amount_cents: Some(payment.amount_cents),
            currency: Some(payment.currency.clone()),
            record: serde_json::to_value(payment).ok(),
            ..Self::new(AuditAction::PaymentRecorded, payment.id.as_str())
        }
    }

    /// Rebuild of the projection; `corrected` is the number of drifted pairs
    pub fn balances_rebuilt(corrected: usize, changes: Vec<String>) -> Self {
        Self {
            label: Some(format!("{} pairs corrected", corrected)),
            changes,
            ..Self::new(AuditAction::BalancesRebuilt, "balances")
        }
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.action,
            self.record_id
        );

        if let Some(group_id) = &self.group_id {
            if group_id.as_str() != self.record_id {
                output.push_str(&format!(" in {}", group_id));
            }
        }
        if let Some(label) = &self.label {
            output.push_str(&format!(" ({})", label));
        }
        if let Some(cents) = self.amount_cents {
            let money = Money::from_cents(cents);
            match &self.currency {
                Some(code) => output.push_str(&format!(" {}", money.format_with_code(code))),
                None => output.push_str(&format!(" {}", money)),
            }
        }
        for change in &self.changes {
            output.push_str(&format!("\n  {}", change));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, Store};
    use crate::services::ledger::{record_payment, PaymentRequest};
    use crate::services::registry::{create_group, upsert_user};
    use serde_json::json;

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::BillRecorded.to_string(), "bill recorded");
        assert_eq!(
            serde_json::to_value(AuditAction::BalancesRebuilt).unwrap(),
            json!("balances_rebuilt")
        );
    }

    #[test]
    fn test_bill_entry_carries_group_and_amount() {
        let store = crate::export::sample_store();
        let txn = &store.transactions[0];

        let entry = AuditEntry::bill_recorded(txn);
        assert_eq!(entry.group_id.as_ref(), Some(&txn.group_id));
        assert_eq!(entry.amount_cents, Some(2501));
        assert_eq!(entry.record.as_ref().unwrap()["title"], json!("Pizza, large"));

        let formatted = entry.format_human_readable();
        assert!(formatted.contains(&format!("bill recorded {} in {}", txn.id, txn.group_id)));
        assert!(formatted.ends_with("(Pizza, large) 25.01 CAD"));
    }

    #[test]
    fn test_payment_entry_names_direction() {
        let mut store = Store::default();
        let (a, _) = upsert_user(&mut store, "Amir").unwrap();
        let (b, _) = upsert_user(&mut store, "Logan").unwrap();
        let group =
            create_group(&mut store, "RT_DEV", &[a.clone(), b.clone()], Utc::now()).unwrap();
        let payment = record_payment(
            &mut store,
            PaymentRequest::new(group.clone(), b.clone(), a.clone(), Amount::Cents(500)),
            Utc::now(),
        )
        .unwrap();

        let entry = AuditEntry::payment_recorded(&payment);
        assert_eq!(entry.group_id, Some(group));
        assert_eq!(entry.label, Some(format!("{} -> {}", b, a)));
        assert!(entry.format_human_readable().ends_with("5.00 CAD"));
    }

    #[test]
    fn test_group_entry_does_not_repeat_its_id() {
        let group = Group::new("RT_DEV", vec![]);
        let formatted = AuditEntry::group_created(&group).format_human_readable();
        assert!(formatted.ends_with(&format!("group created {} (RT_DEV)", group.id)));
    }

    #[test]
    fn test_rebuild_entry_lists_changes() {
        let entry = AuditEntry::balances_rebuilt(1, vec!["balances.global.net.u_a: added".into()]);
        let line = serde_json::to_value(&entry).unwrap();
        assert!(line.get("group_id").is_none());
        assert!(line.get("record").is_none());

        let formatted = entry.format_human_readable();
        assert!(formatted.contains("balances rebuilt balances (1 pairs corrected)"));
        assert!(formatted.ends_with("\n  balances.global.net.u_a: added"));
    }
}

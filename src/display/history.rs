//! Transaction and payment display formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{Money, Payment, Store, Transaction};

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Format a group's transactions and payments, oldest first
pub fn format_history(store: &Store, transactions: &[Transaction], payments: &[Payment]) -> String {
    if transactions.is_empty() && payments.is_empty() {
        return "No activity yet.".to_string();
    }

    let mut rows: Vec<(chrono::DateTime<chrono::Utc>, HistoryRow)> = transactions
        .iter()
        .map(|t| {
            (
                t.created_at,
                HistoryRow {
                    date: t.created_at.format("%Y-%m-%d").to_string(),
                    kind: format!("bill ({})", t.split.method),
                    description: truncate(&t.title, 30),
                    from: store.display_name(&t.paid_by),
                    amount: Money::from_cents(t.total_amount_cents).format_with_code(&t.currency),
                },
            )
        })
        .chain(payments.iter().map(|p| {
            (
                p.created_at,
                HistoryRow {
                    date: p.created_at.format("%Y-%m-%d").to_string(),
                    kind: "payment".to_string(),
                    description: format!("to {}", store.display_name(&p.to_user_id)),
                    from: store.display_name(&p.from_user_id),
                    amount: Money::from_cents(p.amount_cents).format_with_code(&p.currency),
                },
            )
        }))
        .collect();
    rows.sort_by_key(|(ts, _)| *ts);

    Table::new(rows.into_iter().map(|(_, row)| row))
        .with(Style::sharp())
        .to_string()
}

/// Format a recorded bill: shares, items and what everyone owes the payer
pub fn format_transaction_details(store: &Store, txn: &Transaction) -> String {
    let money = |cents: i64| Money::from_cents(cents).format_with_code(&txn.currency);
    let payer = store.display_name(&txn.paid_by);

    let mut output = String::new();
    output.push_str(&format!("Bill:     {}\n", txn.title));
    output.push_str(&format!("ID:       {}\n", txn.id));
    output.push_str(&format!(
        "Date:     {}\n",
        txn.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!("Total:    {}\n", money(txn.total_amount_cents)));
    output.push_str(&format!("Paid by:  {}\n", payer));
    output.push_str(&format!("Split:    {}\n", txn.split.method));

    if let Some(items) = &txn.items {
        output.push_str("\nItems:\n");
        for item in items {
            let names: Vec<String> = item
                .assigned_member_ids
                .iter()
                .map(|id| store.display_name(id))
                .collect();
            output.push_str(&format!(
                "  {:<24} {:>14}  {}\n",
                truncate(&item.name, 24),
                money(item.cost_cents),
                names.join(", ")
            ));
        }
    }

    output.push_str("\nShares:\n");
    for share in &txn.split.shares {
        output.push_str(&format!(
            "  {:<24} {:>14}\n",
            store.display_name(&share.user_id),
            money(share.share_amount_cents)
        ));
    }

    if txn.debts.is_empty() {
        output.push_str("\nNobody owes anything for this bill.\n");
    } else {
        output.push_str("\nSummary:\n");
        for debt in &txn.debts {
            output.push_str(&format!(
                "  {} owes {} {}\n",
                store.display_name(&debt.from_user_id),
                payer,
                money(debt.amount_cents)
            ));
        }
    }

    if !txn.notes.is_empty() {
        output.push_str(&format!("\nNotes: {}\n", txn.notes));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Amount;
    use crate::services::ledger::{record_equal_split, record_payment, EqualSplit, PaymentRequest};
    use crate::services::registry::{create_group, upsert_user};
    use chrono::Utc;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
    }

    #[test]
    fn test_history_and_details() {
        let mut store = Store::default();
        let (a, _) = upsert_user(&mut store, "Amir").unwrap();
        let (b, _) = upsert_user(&mut store, "Logan").unwrap();
        let group =
            create_group(&mut store, "RT_DEV", &[a.clone(), b.clone()], Utc::now()).unwrap();
        let txn = record_equal_split(
            &mut store,
            EqualSplit::new(
                group.clone(),
                "Groceries",
                Amount::Cents(1000),
                a.clone(),
                vec![a.clone(), b.clone()],
            ),
            Utc::now(),
        )
        .unwrap();
        let payment = record_payment(
            &mut store,
            PaymentRequest::new(group, b, a, Amount::Cents(500)),
            Utc::now(),
        )
        .unwrap();

        let history = format_history(&store, &[txn.clone()], &[payment]);
        assert!(history.contains("bill (equal)"));
        assert!(history.contains("to Amir"));
        assert!(history.contains("10.00 CAD"));

        let details = format_transaction_details(&store, &txn);
        assert!(details.contains("Paid by:  Amir"));
        assert!(details.contains("Logan owes Amir 5.00 CAD"));
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(format_history(&Store::default(), &[], &[]), "No activity yet.");
    }
}

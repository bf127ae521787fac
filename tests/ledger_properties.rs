//! Property tests for netting and for rebuilding balances from history

use chrono::Utc;
use proptest::prelude::*;

use splitledger::models::{Amount, GroupId, NetGraph, Store, UserId};
use splitledger::services::ledger::{
    record_custom_split, record_equal_split, record_payment, replay_balances,
};
use splitledger::services::registry::{create_group, upsert_user};
use splitledger::services::{CustomSplit, EqualSplit, PaymentRequest, ShareInput};

const USERS: usize = 4;

#[derive(Debug, Clone)]
enum Event {
    Equal {
        group: usize,
        payer: usize,
        others: Vec<usize>,
        total_cents: i64,
    },
    Custom {
        group: usize,
        payer: usize,
        shares: Vec<(usize, i64)>,
    },
    Payment {
        group: usize,
        from: usize,
        to: usize,
        amount_cents: i64,
    },
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        (
            0..2usize,
            0..USERS,
            prop::collection::btree_set(0..USERS, 0..USERS),
            0..20_000i64,
        )
            .prop_map(|(group, payer, others, total_cents)| Event::Equal {
                group,
                payer,
                others: others.into_iter().filter(|u| *u != payer).collect(),
                total_cents,
            }),
        (0..2usize, 0..USERS, prop::collection::btree_map(0..USERS, 1..5_000i64, 1..=USERS))
            .prop_map(|(group, payer, shares)| Event::Custom {
                group,
                payer,
                shares: shares.into_iter().collect(),
            }),
        (0..2usize, 0..USERS, 1..USERS, 1..10_000i64).prop_map(
            |(group, from, offset, amount_cents)| Event::Payment {
                group,
                from,
                to: (from + offset) % USERS,
                amount_cents,
            }
        ),
    ]
}

fn fixture() -> (Store, Vec<UserId>, Vec<GroupId>) {
    let mut store = Store::default();
    let users: Vec<UserId> = ["Amir", "Logan", "Levi", "Noor"]
        .iter()
        .map(|name| upsert_user(&mut store, name).unwrap().0)
        .collect();
    let groups = vec![
        create_group(&mut store, "RT_DEV", &users, Utc::now()).unwrap(),
        create_group(&mut store, "Roommates", &users[..3], Utc::now()).unwrap(),
    ];
    (store, users, groups)
}

fn apply(store: &mut Store, users: &[UserId], groups: &[GroupId], event: &Event) {
    let now = Utc::now();
    match event {
        Event::Equal {
            group,
            payer,
            others,
            total_cents,
        } => {
            let mut participants = vec![users[*payer].clone()];
            participants.extend(others.iter().map(|u| users[*u].clone()));
            let txn = record_equal_split(
                store,
                EqualSplit::new(
                    groups[*group].clone(),
                    "Equal",
                    Amount::Cents(*total_cents),
                    users[*payer].clone(),
                    participants,
                ),
                now,
            )
            .unwrap();
            assert_eq!(
                txn.debt_total() + txn.share_of(&users[*payer]),
                txn.total_amount_cents
            );
        }
        Event::Custom {
            group,
            payer,
            shares,
        } => {
            let shares = shares
                .iter()
                .map(|(u, cents)| ShareInput::cents(users[*u].clone(), *cents))
                .collect();
            let txn = record_custom_split(
                store,
                CustomSplit::new(groups[*group].clone(), "Custom", users[*payer].clone(), shares),
                now,
            )
            .unwrap();
            assert_eq!(
                txn.debt_total() + txn.share_of(&users[*payer]),
                txn.total_amount_cents
            );
        }
        Event::Payment {
            group,
            from,
            to,
            amount_cents,
        } => {
            record_payment(
                store,
                PaymentRequest::new(
                    groups[*group].clone(),
                    users[*from].clone(),
                    users[*to].clone(),
                    Amount::Cents(*amount_cents),
                ),
                now,
            )
            .unwrap();
        }
    }
}

proptest! {
    #[test]
    fn incremental_balances_equal_rebuilt(
        events in prop::collection::vec(event_strategy(), 0..40)
    ) {
        let (mut store, users, groups) = fixture();
        for event in &events {
            apply(&mut store, &users, &groups, event);
        }

        let rebuilt = replay_balances(&store, Utc::now()).unwrap();
        prop_assert!(store.balances.drift_from(&rebuilt).is_empty());
        prop_assert_eq!(store.balances.global.net.edges(), rebuilt.global.net.edges());
        for group_id in &groups {
            let stored = store.balances.group(group_id).map(|g| g.edges()).unwrap_or_default();
            let expected = rebuilt.group(group_id).map(|g| g.edges()).unwrap_or_default();
            prop_assert_eq!(stored, expected);
        }
    }

    #[test]
    fn stored_graphs_stay_netted(events in prop::collection::vec(event_strategy(), 1..40)) {
        let (mut store, users, groups) = fixture();
        for event in &events {
            apply(&mut store, &users, &groups, event);
            prop_assert!(store.balances.global.net.is_netted());
            for partition in store.balances.by_group.values() {
                prop_assert!(partition.net.is_netted());
            }
        }
    }

    #[test]
    fn net_graph_keeps_signed_totals(
        deltas in prop::collection::vec((0..USERS, 0..USERS, -5_000i64..5_000), 0..60)
    ) {
        let ids: Vec<UserId> = (0..USERS).map(|i| UserId::from(format!("u_{i}"))).collect();
        let mut net = NetGraph::new();
        let mut signed = [[0i64; USERS]; USERS];

        for (from, to, delta) in &deltas {
            net.apply_delta(&ids[*from], &ids[*to], *delta).unwrap();
            if from != to {
                signed[*from][*to] += delta;
                signed[*to][*from] -= delta;
            }
        }

        prop_assert!(net.is_netted());
        for a in 0..USERS {
            for b in 0..USERS {
                if a == b {
                    continue;
                }
                let expected = signed[a][b];
                prop_assert_eq!(net.edge(&ids[a], &ids[b]) - net.edge(&ids[b], &ids[a]), expected);
            }
        }
    }
}

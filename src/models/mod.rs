//! Core data models for splitledger
//!
//! This module contains the data structures of the ledger document: users,
//! groups, transactions, payments, the balance graph, and the money codec.

pub mod balance;
pub mod ids;
pub mod money;
pub mod store;
pub mod transaction;
pub mod user;

pub use balance::{BalanceDrift, BalanceEdge, BalanceScope, Balances, GroupBalance, NetGraph};
pub use ids::{GroupId, PaymentId, TransactionId, UserId};
pub use money::{from_minor_units, to_minor_units, Amount, Money};
pub use store::{Store, DEFAULT_CURRENCY, SCHEMA_VERSION};
pub use transaction::{BillItem, Debt, Payment, Share, Split, SplitMethod, Transaction};
pub use user::{Group, User};

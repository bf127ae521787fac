//! splitledger - shared expense ledger with netted balances
//!
//! Records who paid for what inside a group, splits each bill equally, by
//! explicit shares or item by item, and keeps a projection of who owes whom
//! with opposing debts netted against each other. Everything lives in one
//! JSON document that is rewritten atomically on every change.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: The ledger document, money and the balance graph
//! - `storage`: JSON file storage behind the `StoreRepository` trait
//! - `services`: Registry, ledger engine, bill ingestion, reconciliation
//! - `audit`: Audit logging system
//! - `backup`: Backup and restore of the store
//! - `export`: JSON, YAML and CSV export
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use splitledger::models::Amount;
//! use splitledger::services::{EqualSplit, LedgerService, RegistryService};
//! use splitledger::storage::JsonStoreRepository;
//!
//! let repo = JsonStoreRepository::new("store.json");
//! let registry = RegistryService::new(&repo);
//! let (amir, _) = registry.upsert_user("Amir")?;
//! let (logan, _) = registry.upsert_user("Logan")?;
//! let group = registry.create_group("RT_DEV", &[amir.clone(), logan.clone()])?;
//!
//! let ledger = LedgerService::new(&repo);
//! ledger.record_equal_split(EqualSplit::new(
//!     group.clone(),
//!     "Pizza",
//!     Amount::parse("30.40")?,
//!     amir.clone(),
//!     vec![amir, logan],
//! ))?;
//! println!("{:?}", ledger.get_group_balances(&group)?.edges);
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};

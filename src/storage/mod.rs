//! Storage layer for splitledger
//!
//! The ledger engine talks to a [`StoreRepository`]: it loads the whole
//! document, mutates it, and saves it back. [`JsonStoreRepository`] keeps the
//! document in one JSON file with atomic writes; [`MemoryStoreRepository`]
//! keeps it in memory.

pub mod file_io;
pub mod json_store;
pub mod memory;

pub use file_io::{read_json, write_json_atomic};
pub use json_store::JsonStoreRepository;
pub use memory::MemoryStoreRepository;

use crate::error::LedgerResult;
use crate::models::Store;

/// Load/save access to the ledger document
///
/// Callers serialize access per document; implementations are not expected
/// to detect concurrent writers.
pub trait StoreRepository {
    /// Read the current document, or a fresh default one if none exists
    fn load(&self) -> LedgerResult<Store>;

    /// Replace the document with `store`, all or nothing
    fn save(&self, store: &Store) -> LedgerResult<()>;

    /// Human-readable location for logs
    fn location(&self) -> String;
}

impl<R: StoreRepository + ?Sized> StoreRepository for &R {
    fn load(&self) -> LedgerResult<Store> {
        (**self).load()
    }

    fn save(&self, store: &Store) -> LedgerResult<()> {
        (**self).save(store)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

//! In-memory repository
//!
//! Holds the document as a serialized snapshot so that every load hands out
//! an independent copy, the same way the file repository does.

use std::cell::{Cell, RefCell};

use crate::error::LedgerResult;
use crate::models::Store;

use super::StoreRepository;

/// Repository that keeps the document in memory
#[derive(Debug, Default)]
pub struct MemoryStoreRepository {
    snapshot: RefCell<Option<String>>,
    saves: Cell<usize>,
}

impl MemoryStoreRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document
    pub fn with_store(store: &Store) -> LedgerResult<Self> {
        let repo = Self::new();
        *repo.snapshot.borrow_mut() = Some(serde_json::to_string(store)?);
        Ok(repo)
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    /// Raw serialized snapshot, if anything was saved
    pub fn snapshot(&self) -> Option<String> {
        self.snapshot.borrow().clone()
    }
}

impl StoreRepository for MemoryStoreRepository {
    fn load(&self) -> LedgerResult<Store> {
        match self.snapshot.borrow().as_deref() {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Store::default()),
        }
    }

    fn save(&self, store: &Store) -> LedgerResult<()> {
        *self.snapshot.borrow_mut() = Some(serde_json::to_string(store)?);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

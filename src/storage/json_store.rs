//! JSON file repository for the ledger document
//!
//! The whole document lives in one file. Every load reads it fresh and every
//! save replaces it atomically; nothing is cached between calls.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::models::Store;

use super::file_io::{read_json, write_json_atomic};
use super::StoreRepository;

/// Repository backed by a single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonStoreRepository {
    path: PathBuf,
}

impl JsonStoreRepository {
    /// Create a repository for the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the document has been written yet
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write a fresh document if none exists yet
    ///
    /// Returns `true` when a new file was created.
    pub fn initialize(&self, currency: &str) -> LedgerResult<bool> {
        if self.exists() {
            return Ok(false);
        }
        self.save(&Store::with_currency(currency))?;
        Ok(true)
    }
}

impl StoreRepository for JsonStoreRepository {
    fn load(&self) -> LedgerResult<Store> {
        let store: Store = read_json(&self.path)?;
        store
            .check_integrity()
            .map_err(|reason| LedgerError::corrupt(&self.path, reason))?;

        debug!(
            path = %self.path.display(),
            users = store.users.len(),
            transactions = store.transactions.len(),
            payments = store.payments.len(),
            "Loaded ledger document"
        );
        Ok(store)
    }

    fn save(&self, store: &Store) -> LedgerResult<()> {
        write_json_atomic(&self.path, store)?;
        debug!(path = %self.path.display(), "Saved ledger document");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

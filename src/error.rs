//! Custom error types for splitledger
//!
//! This module defines the error hierarchy for the ledger using thiserror
//! for ergonomic error definitions.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A user id or name that is not registered in the store
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// A group id or name that is not registered in the store
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    /// Non-positive payment, zero-sum shares, empty participant list, bad decimal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Bill item that cannot be mapped onto group members
    #[error("Invalid assignment: {0}")]
    InvalidAssignment(String),

    /// Store file exists but is unreadable or malformed
    #[error("Corrupt document {}: {reason}", path.display())]
    CorruptDocument { path: PathBuf, reason: String },

    /// Input validation errors that are not about amounts or references
    #[error("Validation error: {0}")]
    Validation(String),

    /// File I/O errors, with the original error kept as the source
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Backup and restore errors
    #[error("Backup error: {0}")]
    Backup(String),
}

impl LedgerError {
    /// Create an "unknown user" error
    pub fn unknown_user(identifier: impl Into<String>) -> Self {
        Self::UnknownUser(identifier.into())
    }

    /// Create an "unknown group" error
    pub fn unknown_group(identifier: impl Into<String>) -> Self {
        Self::UnknownGroup(identifier.into())
    }

    /// Create an I/O error with a description of what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a corrupt-document error for the store at `path`
    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::CorruptDocument {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Check if this is an unknown user or group error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownUser(_) | Self::UnknownGroup(_))
    }

    /// Check if this error was caused by caller input rather than the environment
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownUser(_)
                | Self::UnknownGroup(_)
                | Self::InvalidAmount(_)
                | Self::InvalidAssignment(_)
                | Self::Validation(_)
        )
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

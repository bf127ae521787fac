//! Configuration module for splitledger
//!
//! - Base directory and file path resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::Settings;

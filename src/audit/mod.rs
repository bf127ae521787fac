//! Audit logging for splitledger
//!
//! Records every added user and member, created group, recorded bill and
//! payment, plus each rebuild of the balance projection, in an append-only
//! JSONL file.
//!
//! - `AuditEntry`: timestamp, action, record id and group, with the amount
//!   and the stored record.
//! - `AuditLogger`: appends entries to the log file and reads them back.
//! - `generate_detailed_diff`: dotted-path change list between two JSON values.
//!
//! # Example
//!
//! ```rust,ignore
//! use splitledger::audit::{AuditEntry, AuditLogger};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! logger.log(&AuditEntry::payment_recorded(&payment))?;
//! ```

mod diff;
mod entry;
mod logger;

pub use diff::generate_detailed_diff;
pub use entry::{AuditAction, AuditEntry};
pub use logger::AuditLogger;

//! Service layer for splitledger
//!
//! Each module exposes pure functions over an explicit [`Store`](crate::models::Store)
//! and a service struct that wraps them in a load → validate → mutate → save
//! cycle against a [`StoreRepository`](crate::storage::StoreRepository).

pub mod ingestion;
pub mod ledger;
pub mod reconciliation;
pub mod registry;

pub use ingestion::{allocate_bill, BillAllocation, BillInput, BillLine};
pub use ledger::{
    CustomSplit, EqualSplit, GroupBalances, ItemInput, LedgerService, PaymentRequest, Position,
    RebuildSummary, ShareInput,
};
pub use reconciliation::{reconcile, Discrepancy, ReconciliationSummary};
pub use registry::RegistryService;

use tracing::warn;

use crate::audit::{AuditEntry, AuditLogger};

/// Append an entry to the audit log, if one is configured
///
/// The ledger write has already succeeded by the time this runs, so a failed
/// audit write is logged and otherwise ignored.
pub(crate) fn record_audit(audit: Option<&AuditLogger>, entry: AuditEntry) {
    let Some(logger) = audit else {
        return;
    };

    if let Err(e) = logger.log(&entry) {
        warn!(
            error = %e,
            action = %entry.action,
            record_id = %entry.record_id,
            "Failed to write audit entry"
        );
    }
}

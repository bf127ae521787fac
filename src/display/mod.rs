//! Display formatting for terminal output
//!
//! Lists are rendered as tables; single records as aligned detail views.

pub mod balances;
pub mod history;
pub mod registry;

pub use balances::{format_balance_edges, format_drift, format_positions, format_reconciliation};
pub use history::{format_history, format_transaction_details};
pub use registry::{format_group_details, format_group_list, format_user_list};

//! Export module for splitledger
//!
//! - CSV: activity (shares and payments) or netted balances
//! - JSON: the full ledger document with export metadata
//! - YAML: the same as JSON, for reading

pub mod csv;
pub mod json;
pub mod yaml;

pub use self::csv::{export_activity_csv, export_balances_csv};
pub use json::{export_full_json, ExportMetadata, FullExport, EXPORT_SCHEMA_VERSION};
pub use yaml::export_full_yaml;

#[cfg(test)]
pub(crate) fn sample_store() -> crate::models::Store {
    use crate::models::{Amount, Store};
    use crate::services::ledger::{record_equal_split, EqualSplit};
    use crate::services::registry::{create_group, upsert_user};
    use chrono::Utc;

    let mut store = Store::default();
    let (a, _) = upsert_user(&mut store, "Amir").unwrap();
    let (b, _) = upsert_user(&mut store, "Logan").unwrap();
    let group = create_group(&mut store, "RT_DEV", &[a.clone(), b.clone()], Utc::now()).unwrap();
    record_equal_split(
        &mut store,
        EqualSplit::new(group, "Pizza, large", Amount::Cents(2501), a.clone(), vec![a, b]),
        Utc::now(),
    )
    .unwrap();
    store
}

//! Foreign-key eligibility over catalog snapshots.
//!
//! A field may reference another table only when that table has exactly one
//! primary-key column and its base type equals the field's base type. Length
//! parameters are ignored, so `VARCHAR(10)` may reference `VARCHAR(50)`.

use super::{CatalogSnapshot, ColumnInfo};
use crate::model::field::{base_type_of, ColumnType};

/// A table/column pair a field may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkTarget {
    pub table: String,
    pub column: String,
    pub declared_type: String,
}

/// The table's primary-key column when the key has exactly one column.
pub fn single_primary_key(snapshot: &CatalogSnapshot) -> Option<&ColumnInfo> {
    let mut keys = snapshot.columns.iter().filter(|c| c.is_primary_key());
    let first = keys.next()?;
    keys.next().is_none().then_some(first)
}

/// Lists every table (other than `current_table`) a field of `field_type`
/// may reference, in the order the snapshots are given.
pub fn fk_targets<'a>(
    current_table: &str,
    field_type: &ColumnType,
    snapshots: impl IntoIterator<Item = &'a CatalogSnapshot>,
) -> Vec<FkTarget> {
    if !field_type.is_assigned() {
        return Vec::new();
    }
    let field_base = field_type.base_type();

    snapshots
        .into_iter()
        .filter(|snapshot| snapshot.table != current_table)
        .filter_map(|snapshot| {
            let key = single_primary_key(snapshot)?;
            (base_type_of(&key.declared_type) == field_base).then(|| FkTarget {
                table: snapshot.table.clone(),
                column: key.name.clone(),
                declared_type: key.declared_type.clone(),
            })
        })
        .collect()
}

/// Whether any other table qualifies as a foreign-key target.
pub fn is_fk_eligible<'a>(
    current_table: &str,
    field_type: &ColumnType,
    snapshots: impl IntoIterator<Item = &'a CatalogSnapshot>,
) -> bool {
    !fk_targets(current_table, field_type, snapshots).is_empty()
}

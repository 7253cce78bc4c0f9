//! Field-level comparison between a live table and its desired shape.
//!
//! Pure: both sides are descriptors, so this never touches the engine.

use crate::model::field::{FieldDescriptor, ForeignKeyRef, TableDescriptor};
use serde::Serialize;

/// Field names grouped by the kind of change they need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDiff {
    /// Present only in the desired descriptor.
    pub added: Vec<String>,
    /// Type, not-null, default or primary-key flag differ.
    pub modified: Vec<String>,
    /// Present only in the live table.
    pub removed: Vec<String>,
    /// Unique, check, foreign key or auto-increment differ, or an added field
    /// carries a constraint `ADD COLUMN` cannot express.
    pub structural: Vec<String>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.removed.is_empty()
            && self.structural.is_empty()
    }

    /// Whether anything beyond plain column additions changed.
    pub fn needs_rebuild(&self) -> bool {
        !self.modified.is_empty() || !self.removed.is_empty() || !self.structural.is_empty()
    }
}

/// Compares by field name; column order alone is not a change.
pub fn diff_schema(live: &TableDescriptor, desired: &TableDescriptor) -> SchemaDiff {
    let mut diff = SchemaDiff::default();

    for wanted in desired.fields() {
        match live.field(&wanted.name) {
            None => {
                diff.added.push(wanted.name.clone());
                if wanted.needs_table_constraints() {
                    diff.structural.push(wanted.name.clone());
                }
            }
            Some(current) => {
                if column_differs(current, wanted) {
                    diff.modified.push(wanted.name.clone());
                }
                if constraints_differ(current, wanted) {
                    diff.structural.push(wanted.name.clone());
                }
            }
        }
    }

    diff.removed = live
        .fields()
        .iter()
        .filter(|field| !desired.contains(&field.name))
        .map(|field| field.name.clone())
        .collect();
    diff
}

fn column_differs(current: &FieldDescriptor, wanted: &FieldDescriptor) -> bool {
    !wanted.field_type.matches_declared(&current.field_type.sql())
        || current.not_null != wanted.not_null
        || current.default_text() != wanted.default_text()
        || current.primary_key != wanted.primary_key
}

fn constraints_differ(current: &FieldDescriptor, wanted: &FieldDescriptor) -> bool {
    current.effective_unique() != wanted.effective_unique()
        || current.check_text() != wanted.check_text()
        || current.auto_increment != wanted.auto_increment
        || references_differ(current.foreign_key.as_ref(), wanted.foreign_key.as_ref())
}

fn references_differ(current: Option<&ForeignKeyRef>, wanted: Option<&ForeignKeyRef>) -> bool {
    match (current, wanted) {
        (None, None) => false,
        (Some(current), Some(wanted)) => !current.same_effect(wanted),
        _ => true,
    }
}

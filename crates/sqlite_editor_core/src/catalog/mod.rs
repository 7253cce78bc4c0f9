//! Live catalog metadata and its connection-scoped cache.
//!
//! # Responsibility
//! - Model what the engine reports about existing tables.
//! - Cache per-table snapshots until the next schema change.
//!
//! # Invariants
//! - An empty snapshot means the table does not exist.
//! - The cache is cleared on connect, on close and after every DDL statement.
//!
//! # See also
//! - `reader` for the queries that fill the cache.

pub mod eligibility;
mod reader;

pub use eligibility::{fk_targets, is_fk_eligible, single_primary_key, FkTarget};
pub use reader::CatalogReader;

use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub column_id: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position in the primary key, 0 when not part of it.
    pub pk_position: i64,
}

impl ColumnInfo {
    pub fn is_primary_key(&self) -> bool {
        self.pk_position > 0
    }
}

/// One row of `PRAGMA foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyInfo {
    pub id: i64,
    pub seq: i64,
    pub target_table: String,
    pub from_column: String,
    /// `None` when the reference targets the parent's implicit primary key.
    pub target_column: Option<String>,
    pub on_update: String,
    pub on_delete: String,
}

/// Read-only view of one existing table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogSnapshot {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

impl CatalogSnapshot {
    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// Primary-key columns ordered by their key position.
    pub fn primary_key_columns(&self) -> Vec<&ColumnInfo> {
        let mut columns = self
            .columns
            .iter()
            .filter(|column| column.is_primary_key())
            .collect::<Vec<_>>();
        columns.sort_by_key(|column| column.pk_position);
        columns
    }

    /// Single-column foreign key declared on `column`, if any.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKeyInfo> {
        self.foreign_keys.iter().find(|fk| {
            fk.from_column == column
                && self.foreign_keys.iter().filter(|other| other.id == fk.id).count() == 1
        })
    }
}

/// Which cache entries to drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheScope {
    Table(String),
    All,
}

/// Snapshot cache owned by a `Session`.
///
/// Interior mutability keeps catalog reads on `&Session`; the editor runs on
/// one thread, so `RefCell` is sufficient.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: RefCell<HashMap<String, CatalogSnapshot>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str) -> Option<CatalogSnapshot> {
        self.entries.borrow().get(table).cloned()
    }

    pub fn insert(&self, snapshot: CatalogSnapshot) {
        self.entries
            .borrow_mut()
            .insert(snapshot.table.clone(), snapshot);
    }

    pub fn contains(&self, table: &str) -> bool {
        self.entries.borrow().contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn invalidate(&self, scope: CacheScope) {
        let mut entries = self.entries.borrow_mut();
        match scope {
            CacheScope::Table(table) => {
                entries.remove(&table);
                debug!("event=catalog_invalidate module=catalog scope=table table={table}");
            }
            CacheScope::All => {
                let dropped = entries.len();
                entries.clear();
                debug!("event=catalog_invalidate module=catalog scope=all dropped={dropped}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheScope, CatalogCache, CatalogSnapshot, ColumnInfo};

    fn snapshot(table: &str) -> CatalogSnapshot {
        CatalogSnapshot {
            table: table.to_string(),
            columns: vec![ColumnInfo {
                column_id: 0,
                name: "id".to_string(),
                declared_type: "INTEGER".to_string(),
                not_null: false,
                default_value: None,
                pk_position: 1,
            }],
            foreign_keys: Vec::new(),
        }
    }

    #[test]
    fn invalidate_table_keeps_other_entries() {
        let cache = CatalogCache::new();
        cache.insert(snapshot("a"));
        cache.insert(snapshot("b"));

        cache.invalidate(CacheScope::Table("a".to_string()));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));

        cache.invalidate(CacheScope::All);
        assert!(cache.is_empty());
    }

    #[test]
    fn primary_key_columns_follow_key_position() {
        let mut snap = snapshot("t");
        snap.columns.push(ColumnInfo {
            column_id: 1,
            name: "first".to_string(),
            declared_type: "TEXT".to_string(),
            not_null: false,
            default_value: None,
            pk_position: 1,
        });
        snap.columns[0].pk_position = 2;

        let names = snap
            .primary_key_columns()
            .into_iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["first", "id"]);
    }
}

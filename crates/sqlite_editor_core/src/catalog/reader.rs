//! Catalog queries against the open connection.
//!
//! # Responsibility
//! - Read table, column, foreign-key and unique-index metadata.
//! - Rebuild a `TableDescriptor` from what the engine stored.
//!
//! # Invariants
//! - `table_info` results are served from the session cache once loaded.
//! - A missing table yields empty results, never an error.

use super::eligibility::{self, single_primary_key, FkTarget};
use super::{CatalogCache, CatalogSnapshot, ColumnInfo, ForeignKeyInfo};
use crate::ddl::{extract_check_expression, quote_identifier};
use crate::error::{EditorResult, EngineResultExt};
use crate::model::field::{
    ColumnType, FieldDescriptor, FkAction, ForeignKeyRef, TableDescriptor, TypeKind,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

const TABLES_SQL: &str = "SELECT name
FROM sqlite_master
WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\';";

const TABLE_INFO_SQL: &str = "SELECT cid, name, type, \"notnull\", dflt_value, pk
FROM pragma_table_info(?1)
ORDER BY cid;";

const FOREIGN_KEYS_SQL: &str = "SELECT id, seq, \"table\", \"from\", \"to\", on_update, on_delete
FROM pragma_foreign_key_list(?1)
ORDER BY id, seq;";

const UNIQUE_INDEX_COLUMNS_SQL: &str = "SELECT il.name, ii.name
FROM pragma_index_list(?1) AS il
JOIN pragma_index_info(il.name) AS ii
WHERE il.\"unique\" = 1 AND il.origin = 'u'
ORDER BY il.name, ii.seqno;";

/// Borrowed view over a session's connection and catalog cache.
pub struct CatalogReader<'a> {
    conn: &'a Connection,
    cache: &'a CatalogCache,
}

impl<'a> CatalogReader<'a> {
    pub fn new(conn: &'a Connection, cache: &'a CatalogCache) -> Self {
        Self { conn, cache }
    }

    /// User tables in catalog order.
    pub fn tables(&self) -> EditorResult<Vec<String>> {
        let mut stmt = self.conn.prepare(TABLES_SQL).context("list tables")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("list tables")?;
        rows.collect::<Result<Vec<_>, _>>().context("list tables")
    }

    /// Columns and foreign keys of `table`; empty when it does not exist.
    pub fn table_info(&self, table: &str) -> EditorResult<CatalogSnapshot> {
        if let Some(snapshot) = self.cache.get(table) {
            return Ok(snapshot);
        }

        let snapshot = CatalogSnapshot {
            table: table.to_string(),
            columns: self.read_columns(table)?,
            foreign_keys: self.read_foreign_keys(table)?,
        };
        debug!(
            "event=catalog_load module=catalog table={} columns={} foreign_keys={}",
            table,
            snapshot.columns.len(),
            snapshot.foreign_keys.len()
        );
        self.cache.insert(snapshot.clone());
        Ok(snapshot)
    }

    pub fn table_exists(&self, table: &str) -> EditorResult<bool> {
        Ok(self.table_info(table)?.exists())
    }

    /// Stored `CREATE TABLE` text, or an empty string.
    pub fn table_sql(&self, table: &str) -> EditorResult<String> {
        let sql: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1;",
                [table],
                |row| row.get(0),
            )
            .optional()
            .in_table(table)?;
        Ok(sql.flatten().unwrap_or_default())
    }

    /// Columns covered by a single-column `UNIQUE` constraint.
    pub fn unique_columns(&self, table: &str) -> EditorResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(UNIQUE_INDEX_COLUMNS_SQL)
            .in_table(table)?;
        let rows = stmt
            .query_map([table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .in_table(table)?;

        let mut by_index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in rows {
            let (index, column) = row.in_table(table)?;
            by_index.entry(index).or_default().push(column);
        }

        let mut columns = by_index
            .into_values()
            .filter(|columns| columns.len() == 1)
            .flatten()
            .collect::<Vec<_>>();
        columns.dedup();
        Ok(columns)
    }

    pub fn row_count(&self, table: &str) -> EditorResult<i64> {
        self.conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {};", quote_identifier(table)),
                [],
                |row| row.get(0),
            )
            .in_table(table)
    }

    /// Derives the descriptor the editor would have used to create `table`.
    ///
    /// Returns an empty descriptor for a missing table.
    pub fn load_table_descriptor(&self, table: &str) -> EditorResult<TableDescriptor> {
        let snapshot = self.table_info(table)?;
        if !snapshot.exists() {
            return Ok(TableDescriptor::new());
        }

        let create_sql = self.table_sql(table)?;
        let unique = self.unique_columns(table)?;
        let auto_column = single_primary_key(&snapshot)
            .filter(|key| ColumnType::parse(&key.declared_type).kind() == Some(TypeKind::Integer))
            .filter(|_| create_sql.to_ascii_uppercase().contains("AUTOINCREMENT"))
            .map(|key| key.name.clone());

        let mut fields = Vec::with_capacity(snapshot.columns.len());
        for column in &snapshot.columns {
            let mut field = FieldDescriptor::new(
                column.name.clone(),
                ColumnType::parse(&column.declared_type),
            );
            field.not_null = column.not_null;
            field.primary_key = column.is_primary_key();
            field.auto_increment = auto_column.as_deref() == Some(column.name.as_str());
            field.unique = !field.primary_key && unique.contains(&column.name);
            field.default_value = column.default_value.clone();
            field.check_expression = extract_check_expression(&create_sql, &column.name);
            field.foreign_key = match snapshot.foreign_key_for(&column.name) {
                Some(info) => self.resolve_reference(info)?,
                None => None,
            };
            fields.push(field);
        }
        Ok(TableDescriptor::from_fields(fields))
    }

    /// Tables a field of `field_type` in `current_table` may reference.
    pub fn fk_targets(
        &self,
        current_table: &str,
        field_type: &ColumnType,
    ) -> EditorResult<Vec<FkTarget>> {
        let snapshots = self
            .tables()?
            .iter()
            .map(|table| self.table_info(table))
            .collect::<EditorResult<Vec<_>>>()?;
        Ok(eligibility::fk_targets(
            current_table,
            field_type,
            &snapshots,
        ))
    }

    fn resolve_reference(&self, info: &ForeignKeyInfo) -> EditorResult<Option<ForeignKeyRef>> {
        let target_column = match &info.target_column {
            Some(column) => Some(column.clone()),
            // `REFERENCES parent` without a column targets the parent's key.
            None => single_primary_key(&self.table_info(&info.target_table)?)
                .map(|key| key.name.clone()),
        };
        Ok(target_column.map(|target_column| ForeignKeyRef {
            target_table: info.target_table.clone(),
            target_column,
            on_delete: FkAction::parse(&info.on_delete).unwrap_or(FkAction::NoAction),
            on_update: FkAction::parse(&info.on_update).unwrap_or(FkAction::NoAction),
        }))
    }

    fn read_columns(&self, table: &str) -> EditorResult<Vec<ColumnInfo>> {
        let mut stmt = self.conn.prepare(TABLE_INFO_SQL).in_table(table)?;
        let rows = stmt
            .query_map(params![table], |row| {
                Ok(ColumnInfo {
                    column_id: row.get(0)?,
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    default_value: row.get(4)?,
                    pk_position: row.get(5)?,
                })
            })
            .in_table(table)?;
        rows.collect::<Result<Vec<_>, _>>().in_table(table)
    }

    fn read_foreign_keys(&self, table: &str) -> EditorResult<Vec<ForeignKeyInfo>> {
        let mut stmt = self.conn.prepare(FOREIGN_KEYS_SQL).in_table(table)?;
        let rows = stmt
            .query_map(params![table], |row| {
                Ok(ForeignKeyInfo {
                    id: row.get(0)?,
                    seq: row.get(1)?,
                    target_table: row.get(2)?,
                    from_column: row.get(3)?,
                    target_column: row.get(4)?,
                    on_update: row.get(5)?,
                    on_delete: row.get(6)?,
                })
            })
            .in_table(table)?;
        rows.collect::<Result<Vec<_>, _>>().in_table(table)
    }
}

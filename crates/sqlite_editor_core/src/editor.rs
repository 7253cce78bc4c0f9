//! Command interface for editing one table's schema.
//!
//! # Responsibility
//! - Hold the working descriptor for a new or existing table.
//! - Validate every edit as it is made and track unsaved changes.
//! - Preview and apply the result through the migrator.
//!
//! # Invariants
//! - The working descriptor satisfies `TableDescriptor::validate` after
//!   every successful edit.
//! - After a successful apply the baseline equals the applied descriptor.

use crate::catalog::{CatalogReader, FkTarget};
use crate::db::Session;
use crate::ddl::synthesize_create_table;
use crate::error::EditorResult;
use crate::migrate::{ApplyOutcome, MigrationPlan, SchemaMigrator};
use crate::model::field::{
    validate_identifier, ColumnType, FieldDescriptor, IdentifierKind, TableDescriptor,
};
use log::debug;

#[derive(Debug, Clone)]
pub struct SchemaEditSession {
    table: String,
    fields: TableDescriptor,
    baseline: TableDescriptor,
}

impl SchemaEditSession {
    /// Starts editing a table that does not exist yet.
    pub fn new_table(table: impl Into<String>) -> EditorResult<Self> {
        let table = table.into();
        validate_identifier(IdentifierKind::Table, &table)?;
        Ok(Self {
            table,
            fields: TableDescriptor::new(),
            baseline: TableDescriptor::new(),
        })
    }

    /// Starts editing an existing table from its catalog entry.
    pub fn load(catalog: &CatalogReader<'_>, table: &str) -> EditorResult<Self> {
        validate_identifier(IdentifierKind::Table, table)?;
        let fields = catalog.load_table_descriptor(table)?;
        debug!(
            "event=schema_edit_load module=editor table={} fields={}",
            table,
            fields.len()
        );
        Ok(Self {
            table: table.to_string(),
            baseline: fields.clone(),
            fields,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &TableDescriptor {
        &self.fields
    }

    pub fn add_field(&mut self, field: FieldDescriptor) -> EditorResult<()> {
        self.fields.add_field(field)?;
        Ok(())
    }

    /// Replaces the field currently named `name`; renames are allowed.
    pub fn modify_field(&mut self, name: &str, field: FieldDescriptor) -> EditorResult<()> {
        self.fields.modify_field(name, field)?;
        Ok(())
    }

    pub fn remove_field(&mut self, name: &str) -> EditorResult<FieldDescriptor> {
        Ok(self.fields.remove_field(name)?)
    }

    /// Canonical DDL for the working descriptor; `None` while it is empty.
    pub fn preview(&self) -> Option<String> {
        synthesize_create_table(&self.table, &self.fields)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.fields != self.baseline
    }

    /// Drops unsaved edits.
    pub fn revert(&mut self) {
        self.fields = self.baseline.clone();
    }

    /// Tables the field could reference given its type.
    pub fn fk_targets(
        &self,
        catalog: &CatalogReader<'_>,
        field_type: &ColumnType,
    ) -> EditorResult<Vec<FkTarget>> {
        catalog.fk_targets(&self.table, field_type)
    }

    /// The migration `apply` would run, without executing it.
    pub fn plan(&self, session: &Session) -> EditorResult<MigrationPlan> {
        SchemaMigrator::new(session)?.plan(&self.table, &self.fields)
    }

    pub fn apply(&mut self, session: &Session) -> EditorResult<ApplyOutcome> {
        let outcome = SchemaMigrator::new(session)?.apply_changes(&self.table, &self.fields)?;
        self.baseline = self.fields.clone();
        Ok(outcome)
    }
}

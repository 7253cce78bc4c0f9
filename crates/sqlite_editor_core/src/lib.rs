//! Core of an interactive SQLite schema editor.
//! Schema diff and migration, catalog access, row editing and CSV transfer.

pub mod catalog;
pub mod config;
pub mod csv_io;
pub mod db;
pub mod ddl;
pub mod editor;
pub mod error;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod query;
pub mod rows;

pub use catalog::{
    CacheScope, CatalogReader, CatalogSnapshot, ColumnInfo, FkTarget, ForeignKeyInfo,
};
pub use config::{JournalMode, SessionSettings, Synchronous};
pub use csv_io::{export_csv, import_csv};
pub use db::{with_busy_retry, RetryPolicy, Session};
pub use ddl::synthesize_create_table;
pub use editor::SchemaEditSession;
pub use error::{EditorError, EditorResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use migrate::{
    ApplyOutcome, ApplyWarning, MigrationPath, MigrationPlan, SchemaDiff, SchemaMigrator,
};
pub use model::field::{
    ColumnType, FieldDescriptor, FkAction, ForeignKeyRef, TableDescriptor, TypeKind,
    ValidationError,
};
pub use query::{is_complete_statement, QueryExecutor, QueryOutput};
pub use rows::{
    CancellationToken, ColumnFilter, Page, PageRequest, RowChange, RowData, RowEditor,
    SaveSummary, SortSpec,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

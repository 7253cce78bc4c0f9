//! Schema diff and migration.
//!
//! # Responsibility
//! - Decide how an existing table reaches a desired descriptor: create,
//!   add columns in place, or rebuild through a temporary table.
//! - Run the chosen path atomically and invalidate the catalog afterwards.
//!
//! # Invariants
//! - Descriptors are validated before any statement reaches the engine.
//! - Additive and rebuild paths run in one `IMMEDIATE` transaction; a failure
//!   leaves the original table untouched.
//! - The rebuilt table passes `foreign_key_check` before commit.
//! - Indexes and triggers attached to a rebuilt table are not recreated.
//!
//! # See also
//! - `ddl` for the statement text executed here.

pub mod diff;

pub use diff::{diff_schema, SchemaDiff};

use crate::catalog::{CacheScope, CatalogCache, CatalogReader};
use crate::db::Session;
use crate::ddl::{add_column_definition, quote_identifier, synthesize_create_table};
use crate::error::{EditorError, EditorResult, EngineResultExt};
use crate::model::field::{
    validate_identifier, IdentifierKind, TableDescriptor, ValidationError,
};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Suffix of the scratch table used by the rebuild path.
pub const TEMP_TABLE_SUFFIX: &str = "_temp";

/// Which migration path ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPath {
    Created,
    Unchanged,
    Additive,
    Rebuilt,
}

impl MigrationPath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Unchanged => "unchanged",
            Self::Additive => "additive",
            Self::Rebuilt => "rebuilt",
        }
    }
}

/// Non-fatal adjustments made while applying a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplyWarning {
    /// Added without `NOT NULL` because no default was supplied.
    NotNullRelaxed { field: String },
    /// No column survived the rebuild, so only the row count was kept.
    RowsReplacedWithNulls { rows: usize },
}

impl Display for ApplyWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotNullRelaxed { field } => write!(
                f,
                "field `{field}` was added without NOT NULL because it has no default value"
            ),
            Self::RowsReplacedWithNulls { rows } => write!(
                f,
                "no existing column matched the new layout; {rows} rows were replaced with empty rows"
            ),
        }
    }
}

/// Migration decided for one table, before anything is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    pub table: String,
    pub path: MigrationPath,
    pub diff: SchemaDiff,
    /// Canonical DDL of the desired table.
    pub create_sql: String,
}

/// Result of a successful `apply_changes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub table: String,
    pub path: MigrationPath,
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    /// Rows carried into the rebuilt table; zero for other paths.
    pub rows_copied: usize,
    pub warnings: Vec<ApplyWarning>,
}

impl ApplyOutcome {
    fn new(plan: &MigrationPlan) -> Self {
        Self {
            table: plan.table.clone(),
            path: plan.path,
            added: plan.diff.added.clone(),
            modified: plan.diff.modified.clone(),
            removed: plan.diff.removed.clone(),
            rows_copied: 0,
            warnings: Vec::new(),
        }
    }
}

/// Applies desired descriptors to tables of one session.
pub struct SchemaMigrator<'a> {
    conn: &'a Connection,
    cache: &'a CatalogCache,
}

impl<'a> SchemaMigrator<'a> {
    pub fn new(session: &'a Session) -> EditorResult<Self> {
        Ok(Self {
            conn: session.connection()?,
            cache: session.cache(),
        })
    }

    /// Validates `desired` and decides the migration path for `table`.
    ///
    /// # Errors
    /// - `Validation` for an invalid name or descriptor, or when the rebuild
    ///   scratch table already exists.
    pub fn plan(&self, table: &str, desired: &TableDescriptor) -> EditorResult<MigrationPlan> {
        validate_identifier(IdentifierKind::Table, table)?;
        if desired.is_empty() {
            return Err(ValidationError::NoFields(table.to_string()).into());
        }
        desired.validate()?;
        let create_sql = synthesize_create_table(table, desired)
            .ok_or_else(|| ValidationError::NoFields(table.to_string()))?;

        let catalog = CatalogReader::new(self.conn, self.cache);
        let live = catalog.load_table_descriptor(table)?;
        if live.is_empty() {
            return Ok(MigrationPlan {
                table: table.to_string(),
                path: MigrationPath::Created,
                diff: SchemaDiff {
                    added: desired.names().into_iter().map(str::to_string).collect(),
                    ..SchemaDiff::default()
                },
                create_sql,
            });
        }

        let diff = diff_schema(&live, desired);
        let path = if diff.is_empty() {
            MigrationPath::Unchanged
        } else if diff.needs_rebuild() {
            let temp_table = temp_table_name(table);
            if catalog.table_exists(&temp_table)? {
                return Err(ValidationError::TempTableExists {
                    table: table.to_string(),
                    temp_table,
                }
                .into());
            }
            MigrationPath::Rebuilt
        } else {
            MigrationPath::Additive
        };

        Ok(MigrationPlan {
            table: table.to_string(),
            path,
            diff,
            create_sql,
        })
    }

    /// Brings `table` to the shape described by `desired`.
    ///
    /// # Side effects
    /// - Clears the whole catalog cache after any executed path.
    /// - Emits `schema_apply` events with duration and status.
    ///
    /// # Errors
    /// - `Constraint` when existing rows violate the new layout; the table is
    ///   left unchanged.
    /// - `Busy` when another connection holds a conflicting lock.
    pub fn apply_changes(
        &self,
        table: &str,
        desired: &TableDescriptor,
    ) -> EditorResult<ApplyOutcome> {
        let started_at = Instant::now();
        let plan = self.plan(table, desired)?;
        info!(
            "event=schema_apply module=migrate status=start table={} path={}",
            table,
            plan.path.as_str()
        );

        let result = match plan.path {
            MigrationPath::Unchanged => Ok(ApplyOutcome::new(&plan)),
            MigrationPath::Created => self.create(&plan),
            MigrationPath::Additive => self.add_columns(&plan, desired),
            MigrationPath::Rebuilt => self.rebuild(&plan, desired),
        };
        if plan.path != MigrationPath::Unchanged {
            self.cache.invalidate(CacheScope::All);
        }

        match &result {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    warn!("event=schema_apply_warning module=migrate table={table} warning={warning}");
                }
                info!(
                    "event=schema_apply module=migrate status=ok table={} path={} rows_copied={} duration_ms={}",
                    table,
                    outcome.path.as_str(),
                    outcome.rows_copied,
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => error!(
                "event=schema_apply module=migrate status=error table={} path={} duration_ms={} error_code={} error={}",
                table,
                plan.path.as_str(),
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }

    fn create(&self, plan: &MigrationPlan) -> EditorResult<ApplyOutcome> {
        self.conn
            .execute_batch(&plan.create_sql)
            .in_table(&plan.table)?;
        Ok(ApplyOutcome::new(plan))
    }

    fn add_columns(
        &self,
        plan: &MigrationPlan,
        desired: &TableDescriptor,
    ) -> EditorResult<ApplyOutcome> {
        let table = plan.table.as_str();
        let mut outcome = ApplyOutcome::new(plan);

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .in_table(table)?;
        for field in desired
            .fields()
            .iter()
            .filter(|field| plan.diff.added.contains(&field.name))
        {
            let (definition, relaxed) = add_column_definition(field);
            tx.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {};",
                quote_identifier(table),
                definition
            ))
            .in_table(table)?;
            if relaxed {
                outcome.warnings.push(ApplyWarning::NotNullRelaxed {
                    field: field.name.clone(),
                });
            }
        }
        tx.commit().in_table(table)?;
        Ok(outcome)
    }

    fn rebuild(&self, plan: &MigrationPlan, desired: &TableDescriptor) -> EditorResult<ApplyOutcome> {
        let table = plan.table.as_str();
        let guard = PragmaGuard::suspend_foreign_keys(self.conn).in_table(table)?;
        let result = self.rebuild_in_transaction(plan, desired);
        let restored = guard.restore().in_table(table);
        let outcome = result?;
        restored?;
        Ok(outcome)
    }

    fn rebuild_in_transaction(
        &self,
        plan: &MigrationPlan,
        desired: &TableDescriptor,
    ) -> EditorResult<ApplyOutcome> {
        let table = plan.table.as_str();
        let temp_table = temp_table_name(table);
        let quoted_table = quote_identifier(table);
        let quoted_temp = quote_identifier(&temp_table);
        let mut outcome = ApplyOutcome::new(plan);

        let live_columns = CatalogReader::new(self.conn, self.cache)
            .table_info(table)?
            .column_names();
        let targets = desired
            .fields()
            .iter()
            .map(|field| quote_identifier(&field.name))
            .collect::<Vec<_>>()
            .join(", ");
        // Fields without a live column are copied as NULL, not their DEFAULT.
        let projection = desired
            .fields()
            .iter()
            .map(|field| {
                if live_columns.contains(&field.name) {
                    quote_identifier(&field.name)
                } else {
                    "NULL".to_string()
                }
            })
            .collect::<Vec<_>>();
        let has_shared = desired
            .fields()
            .iter()
            .any(|field| live_columns.contains(&field.name));

        let temp_sql = synthesize_create_table(&temp_table, desired)
            .ok_or_else(|| ValidationError::NoFields(table.to_string()))?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .in_table(table)?;
        tx.execute_batch(&temp_sql).in_table(table)?;

        if !has_shared {
            let rows: i64 = tx
                .query_row(&format!("SELECT COUNT(*) FROM {quoted_table};"), [], |row| {
                    row.get(0)
                })
                .in_table(table)?;
            let rows = usize::try_from(rows).unwrap_or_default();
            let mut insert = tx
                .prepare(&format!(
                    "INSERT INTO {quoted_temp} ({targets}) VALUES ({});",
                    projection.join(", ")
                ))
                .in_table(table)?;
            for _ in 0..rows {
                insert.execute([]).in_table(table)?;
            }
            drop(insert);
            outcome.rows_copied = rows;
            if rows > 0 {
                outcome
                    .warnings
                    .push(ApplyWarning::RowsReplacedWithNulls { rows });
            }
        } else {
            outcome.rows_copied = tx
                .execute(
                    &format!(
                        "INSERT INTO {quoted_temp} ({targets}) SELECT {} FROM {quoted_table};",
                        projection.join(", ")
                    ),
                    [],
                )
                .in_table(table)?;
        }

        tx.execute_batch(&format!(
            "DROP TABLE {quoted_table};
             ALTER TABLE {quoted_temp} RENAME TO {quoted_table};"
        ))
        .in_table(table)?;

        let violations: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM pragma_foreign_key_check(?1);",
                [table],
                |row| row.get(0),
            )
            .in_table(table)?;
        if violations > 0 {
            return Err(EditorError::Constraint {
                context: format!("table `{table}`"),
                message: format!("{violations} rows violate a foreign key after the rebuild"),
            });
        }

        tx.commit().in_table(table)?;
        Ok(outcome)
    }
}

/// `<table>_temp`, the scratch table used by the rebuild path.
pub fn temp_table_name(table: &str) -> String {
    format!("{table}{TEMP_TABLE_SUFFIX}")
}

/// Connection pragmas switched for the duration of a rebuild.
///
/// Both pragmas are no-ops inside a transaction, so they are set before
/// `BEGIN` and restored after commit or rollback.
struct PragmaGuard<'a> {
    conn: &'a Connection,
    foreign_keys: bool,
    legacy_alter_table: bool,
}

impl<'a> PragmaGuard<'a> {
    fn suspend_foreign_keys(conn: &'a Connection) -> rusqlite::Result<Self> {
        let foreign_keys = read_flag(conn, "foreign_keys")?;
        let legacy_alter_table = read_flag(conn, "legacy_alter_table")?;
        conn.execute_batch(
            "PRAGMA foreign_keys = OFF;
             PRAGMA legacy_alter_table = ON;",
        )?;
        Ok(Self {
            conn,
            foreign_keys,
            legacy_alter_table,
        })
    }

    fn restore(self) -> rusqlite::Result<()> {
        self.conn.execute_batch(&format!(
            "PRAGMA legacy_alter_table = {};
             PRAGMA foreign_keys = {};",
            on_off(self.legacy_alter_table),
            on_off(self.foreign_keys)
        ))
    }
}

fn read_flag(conn: &Connection, pragma: &str) -> rusqlite::Result<bool> {
    conn.query_row(&format!("PRAGMA {pragma};"), [], |row| row.get::<_, i64>(0))
        .map(|value| value != 0)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "ON"
    } else {
        "OFF"
    }
}

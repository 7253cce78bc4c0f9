//! Row paging and batched row edits.
//!
//! # Responsibility
//! - Page through table data with substring filters and one sort column.
//! - Apply inserts, updates and deletes as one cancellable batch.
//!
//! # Invariants
//! - Rows are addressed by `rowid`; `WITHOUT ROWID` tables are not supported.
//! - A batch either commits completely or leaves the table unchanged.
//! - Log lines carry counts only, never cell values.

use crate::catalog::{single_primary_key, CatalogCache, CatalogReader, CatalogSnapshot};
use crate::db::Session;
use crate::ddl::quote_identifier;
use crate::error::{EditorError, EditorResult, EngineResultExt};
use crate::model::field::ValidationError;
use log::{info, warn};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_PAGE_SIZE: usize = 100;

/// Case-insensitive substring match on one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

/// One page of a table, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
    pub filters: Vec<ColumnFilter>,
    pub sort: Option<SortSpec>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            filters: Vec::new(),
            sort: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowData {
    pub rowid: i64,
    /// Cells in column order; `None` is SQL NULL.
    pub values: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub columns: Vec<String>,
    pub rows: Vec<RowData>,
    /// Rows matching the filters across all pages.
    pub total_rows: usize,
    /// Page actually returned after clamping; 0 when nothing matched.
    pub page: usize,
    pub total_pages: usize,
}

/// One pending edit. Values are bound as text and converted by column
/// affinity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RowChange {
    Insert {
        values: Vec<Option<String>>,
    },
    Update {
        rowid: i64,
        column: String,
        value: Option<String>,
    },
    Delete {
        rowid: i64,
    },
}

/// Counts of a committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Cooperative cancellation flag shared with whoever drives the batch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Renders a cell the way the engine prints it; `None` for NULL.
pub fn render_cell(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(render_real(value)),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            let mut text = String::with_capacity(bytes.len() * 2 + 3);
            text.push_str("X'");
            for byte in bytes {
                let _ = write!(text, "{byte:02X}");
            }
            text.push('\'');
            Some(text)
        }
    }
}

fn render_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Escapes `LIKE` wildcards so the pattern matches literally.
fn like_substring(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    escaped.push('%');
    for ch in pattern.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Row access for one session.
pub struct RowEditor<'a> {
    conn: &'a Connection,
    cache: &'a CatalogCache,
}

impl<'a> RowEditor<'a> {
    pub fn new(session: &'a Session) -> EditorResult<Self> {
        Ok(Self {
            conn: session.connection()?,
            cache: session.cache(),
        })
    }

    /// Reads one page. Out-of-range pages are clamped to the last page.
    pub fn page(&self, table: &str, request: &PageRequest) -> EditorResult<Page> {
        let snapshot = self.snapshot(table)?;
        for column in request
            .filters
            .iter()
            .map(|filter| &filter.column)
            .chain(request.sort.iter().map(|sort| &sort.column))
        {
            require_column(&snapshot, column)?;
        }

        let quoted_table = quote_identifier(table);
        let mut where_clause = String::new();
        let mut bindings = Vec::with_capacity(request.filters.len());
        for (index, filter) in request.filters.iter().enumerate() {
            where_clause.push_str(if index == 0 { " WHERE " } else { " AND " });
            let _ = write!(
                where_clause,
                "{} LIKE ? ESCAPE '\\'",
                quote_identifier(&filter.column)
            );
            bindings.push(Value::Text(like_substring(&filter.pattern)));
        }

        let total_rows: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {quoted_table}{where_clause};"),
                params_from_iter(bindings.iter()),
                |row| row.get(0),
            )
            .in_table(table)?;
        let total_rows = usize::try_from(total_rows).unwrap_or_default();

        let page_size = request.page_size.max(1);
        let total_pages = total_rows.div_ceil(page_size);
        let page = if total_pages == 0 {
            0
        } else {
            request.page.clamp(1, total_pages)
        };
        let columns = snapshot.column_names();
        if total_pages == 0 {
            return Ok(Page {
                columns,
                rows: Vec::new(),
                total_rows,
                page,
                total_pages,
            });
        }

        let order_by = match &request.sort {
            Some(sort) => format!(
                "{} {}",
                quote_identifier(&sort.column),
                if sort.descending { "DESC" } else { "ASC" }
            ),
            None => "rowid".to_string(),
        };
        bindings.push(Value::Integer(page_size as i64));
        bindings.push(Value::Integer(((page - 1) * page_size) as i64));

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT rowid, * FROM {quoted_table}{where_clause} ORDER BY {order_by} LIMIT ? OFFSET ?;"
            ))
            .in_table(table)?;
        let width = columns.len();
        let rows = stmt
            .query_map(params_from_iter(bindings.iter()), |row| {
                let mut values = Vec::with_capacity(width);
                for index in 1..=width {
                    values.push(render_cell(row.get_ref(index)?));
                }
                Ok(RowData {
                    rowid: row.get(0)?,
                    values,
                })
            })
            .in_table(table)?
            .collect::<Result<Vec<_>, _>>()
            .in_table(table)?;

        Ok(Page {
            columns,
            rows,
            total_rows,
            page,
            total_pages,
        })
    }

    pub fn save_changes(
        &self,
        table: &str,
        changes: &[RowChange],
        token: &CancellationToken,
    ) -> EditorResult<SaveSummary> {
        self.save_changes_with_progress(table, changes, token, |_, _| {})
    }

    /// Applies `changes` in order inside one transaction.
    ///
    /// `progress(done, total)` runs after each change. The token is checked
    /// before every change and before commit.
    ///
    /// # Errors
    /// - `Cancelled` when the token fires; nothing is committed.
    /// - `Validation` for unknown columns or a wrong value count.
    pub fn save_changes_with_progress(
        &self,
        table: &str,
        changes: &[RowChange],
        token: &CancellationToken,
        mut progress: impl FnMut(usize, usize),
    ) -> EditorResult<SaveSummary> {
        let started_at = Instant::now();
        let snapshot = self.snapshot(table)?;
        let total = changes.len();
        let quoted_table = quote_identifier(table);
        let mut summary = SaveSummary::default();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .in_table(table)?;
        for (done, change) in changes.iter().enumerate() {
            check_cancelled(token, table, done, total)?;
            match change {
                RowChange::Insert { values } => {
                    insert_row(&tx, &snapshot, values)?;
                    summary.inserted += 1;
                }
                RowChange::Update {
                    rowid,
                    column,
                    value,
                } => {
                    require_column(&snapshot, column)?;
                    tx.execute(
                        &format!(
                            "UPDATE {quoted_table} SET {} = ?1 WHERE rowid = ?2;",
                            quote_identifier(column)
                        ),
                        params![value, rowid],
                    )
                    .in_table(table)?;
                    summary.updated += 1;
                }
                RowChange::Delete { rowid } => {
                    tx.execute(
                        &format!("DELETE FROM {quoted_table} WHERE rowid = ?1;"),
                        [rowid],
                    )
                    .in_table(table)?;
                    summary.deleted += 1;
                }
            }
            progress(done + 1, total);
        }
        check_cancelled(token, table, total, total)?;
        tx.commit().in_table(table)?;

        info!(
            "event=rows_save module=rows status=ok table={} inserted={} updated={} deleted={} duration_ms={}",
            table,
            summary.inserted,
            summary.updated,
            summary.deleted,
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }

    /// Deletes the given rows in one transaction; returns rows removed.
    pub fn delete_rows(&self, table: &str, rowids: &[i64]) -> EditorResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .in_table(table)?;
        let mut deleted = 0;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "DELETE FROM {} WHERE rowid = ?1;",
                    quote_identifier(table)
                ))
                .in_table(table)?;
            for rowid in rowids {
                deleted += stmt.execute([rowid]).in_table(table)?;
            }
        }
        tx.commit().in_table(table)?;
        info!("event=rows_delete module=rows status=ok table={table} deleted={deleted}");
        Ok(deleted)
    }

    /// Removes every row; returns rows removed.
    pub fn truncate(&self, table: &str) -> EditorResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .in_table(table)?;
        let deleted = tx
            .execute(&format!("DELETE FROM {};", quote_identifier(table)), [])
            .in_table(table)?;
        tx.commit().in_table(table)?;
        info!("event=rows_truncate module=rows status=ok table={table} deleted={deleted}");
        Ok(deleted)
    }

    fn snapshot(&self, table: &str) -> EditorResult<CatalogSnapshot> {
        let snapshot = CatalogReader::new(self.conn, self.cache).table_info(table)?;
        if !snapshot.exists() {
            return Err(EditorError::Engine {
                context: format!("table `{table}`"),
                message: "no such table".to_string(),
            });
        }
        Ok(snapshot)
    }
}

fn require_column(snapshot: &CatalogSnapshot, column: &str) -> EditorResult<()> {
    if snapshot.column(column).is_none() {
        return Err(ValidationError::UnknownColumn {
            table: snapshot.table.clone(),
            column: column.to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_cancelled(
    token: &CancellationToken,
    table: &str,
    completed: usize,
    total: usize,
) -> EditorResult<()> {
    if token.is_cancelled() {
        warn!(
            "event=rows_save module=rows status=cancelled table={table} completed={completed} total={total}"
        );
        return Err(EditorError::Cancelled {
            context: format!("saving rows of `{table}`"),
            completed,
            total,
        });
    }
    Ok(())
}

/// Inserts one row, filling an empty single-column key with `MAX(key) + 1`.
fn insert_row(
    tx: &Transaction<'_>,
    snapshot: &CatalogSnapshot,
    values: &[Option<String>],
) -> EditorResult<()> {
    let table = snapshot.table.as_str();
    if values.len() != snapshot.columns.len() {
        return Err(ValidationError::ValueCountMismatch {
            table: table.to_string(),
            expected: snapshot.columns.len(),
            actual: values.len(),
        }
        .into());
    }

    let key_index = single_primary_key(snapshot).and_then(|key| {
        snapshot
            .columns
            .iter()
            .position(|column| column.name == key.name)
    });
    let mut bound = values
        .iter()
        .map(|value| match value {
            Some(text) => Value::Text(text.clone()),
            None => Value::Null,
        })
        .collect::<Vec<_>>();

    if let Some(index) = key_index {
        let empty = values[index]
            .as_deref()
            .map_or(true, |text| text.trim().is_empty());
        if empty {
            let key = quote_identifier(&snapshot.columns[index].name);
            let next: i64 = tx
                .query_row(
                    &format!(
                        "SELECT COALESCE(MAX({key}), 0) + 1 FROM {};",
                        quote_identifier(table)
                    ),
                    [],
                    |row| row.get(0),
                )
                .in_table(table)?;
            bound[index] = Value::Integer(next);
        }
    }

    let columns = snapshot
        .columns
        .iter()
        .map(|column| quote_identifier(&column.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; bound.len()].join(", ");
    tx.execute(
        &format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders});",
            quote_identifier(table)
        ),
        params_from_iter(bound.iter()),
    )
    .in_table(table)?;
    Ok(())
}

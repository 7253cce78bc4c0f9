//! Ad-hoc SQL execution.
//!
//! SQL text is opaque here: apart from the engine's completeness check the
//! statement goes to SQLite as written. Only the first statement of the text
//! is executed.

use crate::catalog::{CacheScope, CatalogCache};
use crate::db::{with_busy_retry, RetryPolicy, Session};
use crate::error::{EditorResult, EngineResultExt};
use crate::model::field::ValidationError;
use crate::rows::render_cell;
use log::{debug, info};
use rusqlite::Connection;
use serde::Serialize;
use std::ffi::CString;
use std::time::Instant;

/// Whether `sql` ends with a complete statement, per the engine's tokenizer.
///
/// Text containing a NUL byte is never complete.
pub fn is_complete_statement(sql: &str) -> bool {
    let Ok(text) = CString::new(sql) else {
        return false;
    };
    // SAFETY: `text` is a valid NUL-terminated string that outlives the call,
    // and `sqlite3_complete` only reads it.
    unsafe { rusqlite::ffi::sqlite3_complete(text.as_ptr()) != 0 }
}

/// Result of one executed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutput {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    },
    Affected {
        rows: usize,
    },
}

pub struct QueryExecutor<'a> {
    conn: &'a Connection,
    cache: &'a CatalogCache,
    retry: RetryPolicy,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(session: &'a Session) -> EditorResult<Self> {
        Ok(Self {
            conn: session.connection()?,
            cache: session.cache(),
            retry: session.settings().retry,
        })
    }

    /// Runs one statement.
    ///
    /// # Errors
    /// - `Validation` for empty or incomplete text, before the engine sees it.
    ///
    /// # Side effects
    /// - Clears the catalog cache after any statement that may write.
    pub fn execute(&self, sql: &str) -> EditorResult<QueryOutput> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        if !is_complete_statement(sql) {
            return Err(ValidationError::IncompleteStatement.into());
        }

        let started_at = Instant::now();
        let mut stmt = self.conn.prepare(sql).context("query")?;
        let writes = !stmt.readonly();

        let output = if stmt.column_count() > 0 {
            let columns = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>();
            let width = columns.len();
            let mut rows = Vec::new();
            let mut cursor = stmt.query([]).context("query")?;
            while let Some(row) = cursor.next().context("query")? {
                let mut values = Vec::with_capacity(width);
                for index in 0..width {
                    values.push(render_cell(row.get_ref(index).context("query")?));
                }
                rows.push(values);
            }
            QueryOutput::Rows { columns, rows }
        } else {
            QueryOutput::Affected {
                rows: stmt.execute([]).context("query")?,
            }
        };

        if writes {
            self.cache.invalidate(CacheScope::All);
        }
        match &output {
            QueryOutput::Rows { rows, .. } => debug!(
                "event=query_execute module=query status=ok kind=rows rows={} duration_ms={}",
                rows.len(),
                started_at.elapsed().as_millis()
            ),
            QueryOutput::Affected { rows } => info!(
                "event=query_execute module=query status=ok kind=affected rows={} duration_ms={}",
                rows,
                started_at.elapsed().as_millis()
            ),
        }
        Ok(output)
    }

    /// [`QueryExecutor::execute`] under the session's busy-retry policy.
    pub fn execute_with_retry(&self, sql: &str) -> EditorResult<QueryOutput> {
        with_busy_retry(&self.retry, || self.execute(sql))
    }
}

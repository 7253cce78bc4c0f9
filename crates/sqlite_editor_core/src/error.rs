//! Editor error taxonomy.
//!
//! # Responsibility
//! - Classify engine failures into busy / constraint / engine / unexpected.
//! - Carry the table or operation that failed so callers can report it.
//!
//! # Invariants
//! - `Busy` is the only retryable variant.
//! - Unexpected failures are logged when they are classified.

use crate::db::DbError;
use crate::model::field::ValidationError;
use log::error;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Debug)]
pub enum EditorError {
    /// Caller-supplied input is structurally invalid.
    Validation(ValidationError),
    /// Engine reported lock contention.
    Busy { context: String, message: String },
    /// Engine rejected a statement because of a constraint.
    Constraint { context: String, message: String },
    /// Any other engine failure, including "no connection open".
    Engine { context: String, message: String },
    /// Failure outside the engine contract (I/O, CSV decoding, ...).
    Unexpected { context: String, message: String },
    /// Batch stopped by its cancellation token; nothing was committed.
    Cancelled {
        context: String,
        completed: usize,
        total: usize,
    },
}

impl EditorError {
    /// Maps a rusqlite failure onto the taxonomy.
    pub fn classify(context: impl Into<String>, err: rusqlite::Error) -> Self {
        let context = context.into();
        match &err {
            rusqlite::Error::SqliteFailure(failure, detail) => {
                let message = detail.clone().unwrap_or_else(|| failure.to_string());
                Self::from_code(context, failure.code, message)
            }
            // Prepare-time failures carry the statement offset.
            rusqlite::Error::SqlInputError { error, msg, .. } => {
                Self::from_code(context, error.code, msg.clone())
            }
            rusqlite::Error::QueryReturnedNoRows
            | rusqlite::Error::ExecuteReturnedResults
            | rusqlite::Error::InvalidColumnName(_)
            | rusqlite::Error::InvalidParameterCount(..)
            | rusqlite::Error::MultipleStatement => Self::Engine {
                context,
                message: err.to_string(),
            },
            _ => Self::unexpected(context, err.to_string()),
        }
    }

    fn from_code(context: String, code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Self::Busy { context, message },
            ErrorCode::ConstraintViolation => Self::Constraint { context, message },
            _ => Self::Engine { context, message },
        }
    }

    pub(crate) fn unexpected(context: impl Into<String>, message: impl Into<String>) -> Self {
        let context = context.into();
        let message = message.into();
        error!(
            "event=unexpected_error module=core status=error context={} error={}",
            context, message
        );
        Self::Unexpected { context, message }
    }

    pub(crate) fn not_connected() -> Self {
        Self::Engine {
            context: "session".to_string(),
            message: "no database connection is open".to_string(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    /// Stable short code for log lines and UI mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Busy { .. } => "busy",
            Self::Constraint { .. } => "constraint",
            Self::Engine { .. } => "engine",
            Self::Unexpected { .. } => "unexpected",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Busy { context, message } => {
                write!(f, "database is busy ({context}), please retry: {message}")
            }
            Self::Constraint { context, message } => {
                write!(f, "constraint violation in {context}: {message}")
            }
            Self::Engine { context, message } => write!(f, "{context} failed: {message}"),
            Self::Unexpected { context, message } => {
                write!(f, "unexpected error in {context}: {message}")
            }
            Self::Cancelled {
                context,
                completed,
                total,
            } => write!(
                f,
                "{context} cancelled after {completed} of {total} operations; nothing was saved"
            ),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Busy { .. }
            | Self::Constraint { .. }
            | Self::Engine { .. }
            | Self::Unexpected { .. }
            | Self::Cancelled { .. } => None,
        }
    }
}

impl From<ValidationError> for EditorError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for EditorError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::classify("database open", err),
            other => Self::Engine {
                context: "database open".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Attaches an operation context to raw engine results.
pub(crate) trait EngineResultExt<T> {
    fn context(self, context: &str) -> EditorResult<T>;

    fn in_table(self, table: &str) -> EditorResult<T>;
}

impl<T> EngineResultExt<T> for rusqlite::Result<T> {
    fn context(self, context: &str) -> EditorResult<T> {
        self.map_err(|err| EditorError::classify(context, err))
    }

    fn in_table(self, table: &str) -> EditorResult<T> {
        self.map_err(|err| EditorError::classify(format!("table `{table}`"), err))
    }
}

#[cfg(test)]
mod tests {
    use super::EditorError;
    use rusqlite::Connection;

    #[test]
    fn constraint_failures_are_classified_as_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER NOT NULL);")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t (id) VALUES (NULL);", [])
            .unwrap_err();

        let classified = EditorError::classify("table `t`", err);
        assert_eq!(classified.code(), "constraint");
        assert!(classified.to_string().contains("table `t`"));
    }

    #[test]
    fn syntax_errors_are_engine_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.execute_batch("CREATE TABLE (;").unwrap_err();

        let classified = EditorError::classify("query", err);
        assert_eq!(classified.code(), "engine");
        assert!(!classified.is_retryable());
    }
}

//! SQLite connection bootstrap and session ownership.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the editor.
//! - Own the single active connection and its catalog cache (`Session`).
//! - Provide bounded busy-retry for lock contention.
//!
//! # Invariants
//! - Returned connections have the session pragmas applied.
//! - At most one connection is active per `Session`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod open;
pub mod retry;
pub mod session;

pub use open::{open_db, open_db_in_memory};
pub use retry::{with_busy_retry, RetryPolicy};
pub use session::Session;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file exists but is not an SQLite database.
    NotADatabase(PathBuf),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::NotADatabase(path) => {
                write!(f, "`{}` is not an SQLite database", path.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::NotADatabase(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Apply journal, synchronous, busy-timeout and foreign-key pragmas.
//!
//! # Invariants
//! - A connection is returned only after every pragma succeeded.
//! - Opening a non-database file fails here, not on first use.

use super::{DbError, DbResult};
use crate::config::SessionSettings;
use log::{error, info};
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens (creating if missing) a SQLite database file.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, settings: &SessionSettings) -> DbResult<Connection> {
    let path = path.as_ref();
    open_logged("file", settings, || Connection::open(path)).map_err(|err| match err {
        DbError::Sqlite(inner) if inner.sqlite_error_code() == Some(ErrorCode::NotADatabase) => {
            DbError::NotADatabase(path.to_path_buf())
        }
        other => other,
    })
}

/// Opens a private in-memory database.
pub fn open_db_in_memory(settings: &SessionSettings) -> DbResult<Connection> {
    open_logged("memory", settings, Connection::open_in_memory)
}

fn open_logged(
    mode: &str,
    settings: &SessionSettings,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match opener() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match configure_connection(&conn, settings) {
        Ok(journal_mode) => {
            info!(
                "event=db_open module=db status=ok mode={} journal_mode={} duration_ms={}",
                mode,
                journal_mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_configure_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Applies session pragmas and returns the journal mode the engine accepted.
///
/// In-memory databases report `memory` regardless of the requested mode.
fn configure_connection(conn: &Connection, settings: &SessionSettings) -> DbResult<String> {
    conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;
    let journal_mode: String = conn.query_row(
        &format!(
            "PRAGMA journal_mode = {};",
            settings.journal_mode.as_pragma()
        ),
        [],
        |row| row.get(0),
    )?;
    conn.execute_batch(&format!(
        "PRAGMA synchronous = {};
         PRAGMA foreign_keys = {};",
        settings.synchronous.as_pragma(),
        if settings.foreign_keys { "ON" } else { "OFF" }
    ))?;
    Ok(journal_mode)
}

//! Editor session: the single active connection plus its catalog cache.
//!
//! # Responsibility
//! - Open, create and close database connections on behalf of the editor.
//! - Hand out catalog readers bound to the live connection.
//!
//! # Invariants
//! - Opening a new database closes the previous one first.
//! - The catalog cache is emptied on every open and close.
//! - Operations on a closed session fail with an engine error.

use super::{open_db, open_db_in_memory};
use crate::catalog::{CacheScope, CatalogCache, CatalogReader};
use crate::config::SessionSettings;
use crate::ddl::quote_identifier;
use crate::error::{EditorError, EditorResult, EngineResultExt};
use crate::model::field::{validate_identifier, IdentifierKind};
use log::{info, warn};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Owns at most one connection. Passed by reference to every operation.
#[derive(Debug, Default)]
pub struct Session {
    conn: Option<Connection>,
    path: Option<PathBuf>,
    settings: SessionSettings,
    cache: CatalogCache,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            conn: None,
            path: None,
            settings,
            cache: CatalogCache::new(),
        }
    }

    /// Opens an existing or new database file.
    pub fn open(&mut self, path: impl AsRef<Path>) -> EditorResult<()> {
        let path = path.as_ref();
        self.close();
        let conn = open_db(path, &self.settings)?;
        self.attach(conn, Some(path.to_path_buf()));
        Ok(())
    }

    /// Creates a new database file; fails if `path` already exists.
    pub fn create(&mut self, path: impl AsRef<Path>) -> EditorResult<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(EditorError::Engine {
                context: "database create".to_string(),
                message: format!("`{}` already exists", path.display()),
            });
        }
        self.open(path)
    }

    pub fn open_in_memory(&mut self) -> EditorResult<()> {
        self.close();
        let conn = open_db_in_memory(&self.settings)?;
        self.attach(conn, None);
        Ok(())
    }

    /// Drops the connection, if any. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, err)) = conn.close() {
                warn!("event=db_close module=db status=error error={err}");
            } else {
                info!("event=db_close module=db status=ok");
            }
        }
        self.path = None;
        self.cache.invalidate(CacheScope::All);
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// File backing the connection; `None` for in-memory or closed sessions.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn connection(&self) -> EditorResult<&Connection> {
        self.conn.as_ref().ok_or_else(EditorError::not_connected)
    }

    pub(crate) fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub fn catalog(&self) -> EditorResult<CatalogReader<'_>> {
        Ok(CatalogReader::new(self.connection()?, &self.cache))
    }

    pub fn invalidate_catalog(&self, scope: CacheScope) {
        self.cache.invalidate(scope);
    }

    /// Copies `table` into a new table `backup` (data only, no constraints).
    pub fn backup_table(&self, table: &str, backup: &str) -> EditorResult<()> {
        validate_identifier(IdentifierKind::Table, table)?;
        validate_identifier(IdentifierKind::Table, backup)?;
        self.connection()?
            .execute_batch(&format!(
                "CREATE TABLE {} AS SELECT * FROM {};",
                quote_identifier(backup),
                quote_identifier(table)
            ))
            .in_table(table)?;
        self.cache.invalidate(CacheScope::All);
        info!("event=table_backup module=db status=ok table={table} backup={backup}");
        Ok(())
    }

    fn attach(&mut self, conn: Connection, path: Option<PathBuf>) {
        self.conn = Some(conn);
        self.path = path;
        self.cache.invalidate(CacheScope::All);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

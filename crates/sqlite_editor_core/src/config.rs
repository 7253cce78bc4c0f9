//! Connection and retry settings.
//!
//! # Responsibility
//! - Hold the pragmas applied to every opened database.
//! - Provide defaults matching interactive single-writer editing.
//!
//! # Invariants
//! - Settings are plain data; they are applied only by `db::open`.

use crate::db::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 8_000;

/// `PRAGMA journal_mode` value applied on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    Delete,
    Truncate,
    Wal,
    Memory,
}

impl JournalMode {
    pub fn as_pragma(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Wal => "WAL",
            Self::Memory => "MEMORY",
        }
    }
}

/// `PRAGMA synchronous` value applied on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Synchronous {
    Off,
    Normal,
    Full,
}

impl Synchronous {
    pub fn as_pragma(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
        }
    }
}

/// Per-session engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// How long the engine waits on a lock before reporting busy.
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
    pub synchronous: Synchronous,
    /// Enforce declared foreign keys for row edits.
    pub foreign_keys: bool,
    /// Policy used by callers that opt into busy retry.
    pub retry: RetryPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::Wal,
            synchronous: Synchronous::Normal,
            foreign_keys: true,
            retry: RetryPolicy::default(),
        }
    }
}

//! Whole-collection persistence for the event store.
//!
//! # Responsibility
//! - Define the load/save contract the store writes through to.
//! - Provide SQLite and JSON-file implementations.
//!
//! # Invariants
//! - `save` replaces the full persisted set atomically; readers never see a
//!   half-written snapshot.
//! - `load` returns events in the order they were saved.
//! - Records that fail to decode or validate are skipped with a warning; the
//!   remaining events keep their saved order.

use crate::db::DbError;
use crate::model::event::Event;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod json_file;
mod sqlite;

pub use json_file::JsonFileSnapshotStore;
pub use sqlite::SqliteSnapshotStore;

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug)]
pub enum SnapshotError {
    Db(DbError),
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidData(String),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted event data: {message}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SnapshotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SnapshotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Durable medium holding the full event collection.
pub trait EventSnapshotStore: Send + Sync {
    /// Short backend label used in log lines.
    fn backend(&self) -> &'static str;
    fn load(&self) -> SnapshotResult<Vec<Event>>;
    fn save(&self, events: &[Event]) -> SnapshotResult<()>;
}

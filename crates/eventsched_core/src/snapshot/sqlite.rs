//! SQLite-backed event snapshot.
//!
//! One row per event; `position` keeps insertion order. `save` rewrites the
//! table inside a single transaction.

use super::{EventSnapshotStore, SnapshotError, SnapshotResult};
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::event::Event;
use crate::time::{parse_event_time, EventTime};
use log::warn;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    start_time,
    end_time,
    recurring,
    created_at
FROM events
ORDER BY position ASC";

const EVENT_INSERT_SQL: &str = "INSERT INTO events (
    position,
    id,
    title,
    description,
    start_time,
    end_time,
    recurring,
    created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);";

pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Opens or creates the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a throwaway in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSnapshotStore for SqliteSnapshotStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    /// Rows that do not form a valid event are skipped with a warning.
    fn load(&self) -> SnapshotResult<Vec<Event>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(EVENT_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        let mut events = Vec::new();

        while let Some(row) = rows.next()? {
            match parse_event_row(row) {
                Ok(event) => events.push(event),
                Err(err) => warn!(
                    "event=snapshot_load module=snapshot status=skipped backend=sqlite error={}",
                    err
                ),
            }
        }

        Ok(events)
    }

    fn save(&self, events: &[Event]) -> SnapshotResult<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM events;", [])?;
        {
            let mut stmt = tx.prepare(EVENT_INSERT_SQL)?;
            for (position, event) in events.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    event.id.to_string(),
                    event.title.as_str(),
                    event.description.as_str(),
                    event.start_time.to_canonical_string(),
                    event.end_time.to_canonical_string(),
                    event.recurring.as_deref(),
                    event.created_at.to_canonical_string(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_event_row(row: &Row<'_>) -> SnapshotResult<Event> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        SnapshotError::InvalidData(format!("invalid uuid value `{id_text}` in events.id"))
    })?;

    let event = Event {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        start_time: parse_time_column(row, "start_time")?,
        end_time: parse_time_column(row, "end_time")?,
        recurring: row.get("recurring")?,
        created_at: parse_time_column(row, "created_at")?,
    };
    event
        .validate()
        .map_err(|err| SnapshotError::InvalidData(format!("event {id}: {err}")))?;
    Ok(event)
}

fn parse_time_column(row: &Row<'_>, column: &'static str) -> SnapshotResult<EventTime> {
    let text: String = row.get(column)?;
    parse_event_time(&text).map_err(|err| {
        SnapshotError::InvalidData(format!("invalid time `{text}` in events.{column}: {err}"))
    })
}

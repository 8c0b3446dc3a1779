//! Core domain logic for the event scheduler.
//! This crate is the single source of truth for event invariants, the
//! time-windowed queries and the reminder scan loop.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod snapshot;
pub mod store;
pub mod time;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, PersistenceBackend};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::{Event, EventId, EventValidationError, NewEvent};
pub use model::patch::EventPatch;
pub use reminder::notifier::{LogNotifier, Notifier};
pub use reminder::scanner::{ReminderScanner, ScannerHandle, ScannerSettings, ScannerState};
pub use snapshot::{
    EventSnapshotStore, JsonFileSnapshotStore, SnapshotError, SnapshotResult, SqliteSnapshotStore,
};
pub use store::event_store::EventStore;
pub use time::{parse_event_time, EventTime, ParseError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

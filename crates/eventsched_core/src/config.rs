//! Process configuration.
//!
//! # Responsibility
//! - Provide defaults: SQLite snapshot at `events.sqlite3`, one-minute
//!   scans, one-hour lookahead.
//! - Read overrides from `EVENTSCHED_*` environment variables.
//! - Build the configured snapshot backend.
//!
//! # Invariants
//! - Loading never panics; invalid values come back as readable errors.
//! - Intervals and lookahead are strictly positive and bounded.

use crate::reminder::scanner::ScannerSettings;
use crate::snapshot::{
    EventSnapshotStore, JsonFileSnapshotStore, SnapshotError, SqliteSnapshotStore,
};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATA_PATH: &str = "EVENTSCHED_DATA_PATH";
pub const ENV_BACKEND: &str = "EVENTSCHED_BACKEND";
pub const ENV_LOG_LEVEL: &str = "EVENTSCHED_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "EVENTSCHED_LOG_DIR";
pub const ENV_SCAN_INTERVAL_SECS: &str = "EVENTSCHED_SCAN_INTERVAL_SECS";
pub const ENV_LOOKAHEAD_MINUTES: &str = "EVENTSCHED_LOOKAHEAD_MINUTES";

const DEFAULT_SQLITE_PATH: &str = "events.sqlite3";
const DEFAULT_JSON_PATH: &str = "events.json";
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;
const DEFAULT_LOOKAHEAD_MINUTES: i64 = 60;
const MAX_SCAN_INTERVAL_SECS: u64 = 24 * 60 * 60;
const MAX_LOOKAHEAD_MINUTES: i64 = 366 * 24 * 60;

/// Durable medium for the event snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceBackend {
    Sqlite,
    JsonFile,
}

impl PersistenceBackend {
    fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "json" | "json_file" => Ok(Self::JsonFile),
            other => Err(format!(
                "unsupported backend `{other}`; expected sqlite|json"
            )),
        }
    }

    fn default_path(self) -> &'static str {
        match self {
            Self::Sqlite => DEFAULT_SQLITE_PATH,
            Self::JsonFile => DEFAULT_JSON_PATH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: PersistenceBackend,
    pub data_path: PathBuf,
    pub log_level: String,
    /// `None` lets the binary pick a directory next to the working dir.
    pub log_dir: Option<PathBuf>,
    pub scan_interval: Duration,
    pub lookahead: chrono::Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::Sqlite,
            data_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            lookahead: chrono::Duration::minutes(DEFAULT_LOOKAHEAD_MINUTES),
        }
    }
}

impl AppConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = read(ENV_BACKEND) {
            config.backend = PersistenceBackend::parse(&value)?;
        }
        config.data_path = match read(ENV_DATA_PATH) {
            Some(value) => PathBuf::from(value.trim()),
            None => PathBuf::from(config.backend.default_path()),
        };
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = value.trim().to_string();
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(value.trim()));
        }
        if let Some(value) = read(ENV_SCAN_INTERVAL_SECS) {
            let secs = parse_bounded(ENV_SCAN_INTERVAL_SECS, &value, 1, MAX_SCAN_INTERVAL_SECS)?;
            config.scan_interval = Duration::from_secs(secs);
        }
        if let Some(value) = read(ENV_LOOKAHEAD_MINUTES) {
            let minutes = parse_bounded(ENV_LOOKAHEAD_MINUTES, &value, 1, MAX_LOOKAHEAD_MINUTES)?;
            config.lookahead = chrono::Duration::minutes(minutes);
        }

        Ok(config)
    }

    pub fn scanner_settings(&self) -> ScannerSettings {
        ScannerSettings {
            interval: self.scan_interval,
            lookahead: self.lookahead,
        }
    }

    /// Opens the configured snapshot backend at `data_path`.
    pub fn open_snapshot_store(&self) -> Result<Box<dyn EventSnapshotStore>, SnapshotError> {
        match self.backend {
            PersistenceBackend::Sqlite => {
                Ok(Box::new(SqliteSnapshotStore::open(&self.data_path)?))
            }
            PersistenceBackend::JsonFile => {
                Ok(Box::new(JsonFileSnapshotStore::new(self.data_path.clone())))
            }
        }
    }
}

fn parse_bounded<T>(key: &str, value: &str, min: T, max: T) -> Result<T, String>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|_| format!("{key} must be an integer, got `{}`", value.trim()))?;
    if parsed < min || parsed > max {
        return Err(format!("{key} must be within {min}..={max}, got {parsed}"));
    }
    Ok(parsed)
}

//! JSON file snapshot: a pretty-printed array of events.

use super::{EventSnapshotStore, SnapshotResult};
use crate::model::event::Event;
use log::warn;
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("events.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl EventSnapshotStore for JsonFileSnapshotStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    /// A missing file is an empty collection, not an error.
    ///
    /// Records are decoded one by one; a record that does not form a valid
    /// event is skipped with a warning and the rest still load.
    fn load(&self) -> SnapshotResult<Vec<Event>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        let records: Vec<Value> = serde_json::from_str(&text)?;
        let mut events = Vec::with_capacity(records.len());
        for (position, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Event>(record) {
                Ok(event) => events.push(event),
                Err(err) => warn!(
                    "event=snapshot_load module=snapshot status=skipped backend=json position={} error={}",
                    position, err
                ),
            }
        }
        Ok(events)
    }

    /// Writes a sibling temp file, then renames it over the target.
    fn save(&self, events: &[Event]) -> SnapshotResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let rendered = serde_json::to_string_pretty(events)?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, rendered)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

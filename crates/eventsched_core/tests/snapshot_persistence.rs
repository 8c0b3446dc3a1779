use eventsched_core::db::open_db_in_memory;
use eventsched_core::{
    Event, EventPatch, EventSnapshotStore, EventStore, JsonFileSnapshotStore, NewEvent,
    SnapshotError, SnapshotResult, SqliteSnapshotStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn standup() -> NewEvent {
    NewEvent::new(
        "Standup",
        "Daily sync",
        "2024-01-01T09:00:00",
        "2024-01-01T09:15:00",
    )
}

fn retro() -> NewEvent {
    NewEvent::new(
        "Retro",
        "",
        "2024-01-01T08:00:00+01:00",
        "2024-01-01T09:00:00+01:00",
    )
    .with_recurring("biweekly")
}

#[derive(Clone, Default)]
struct RecordingSnapshots {
    saves: Arc<AtomicUsize>,
    last_saved: Arc<Mutex<Vec<Event>>>,
}

impl EventSnapshotStore for RecordingSnapshots {
    fn backend(&self) -> &'static str {
        "recording"
    }

    fn load(&self) -> SnapshotResult<Vec<Event>> {
        Ok(Vec::new())
    }

    fn save(&self, events: &[Event]) -> SnapshotResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.last_saved.lock().unwrap() = events.to_vec();
        Ok(())
    }
}

struct BrokenSnapshots;

impl EventSnapshotStore for BrokenSnapshots {
    fn backend(&self) -> &'static str {
        "broken"
    }

    fn load(&self) -> SnapshotResult<Vec<Event>> {
        Err(SnapshotError::InvalidData("disk on fire".to_string()))
    }

    fn save(&self, _events: &[Event]) -> SnapshotResult<()> {
        Err(SnapshotError::InvalidData("disk still on fire".to_string()))
    }
}

#[test]
fn sqlite_snapshot_survives_reopen_in_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.sqlite3");

    let (first, second) = {
        let store =
            EventStore::open_with_system_clock(Box::new(SqliteSnapshotStore::open(&path).unwrap()));
        let first = store.create(&standup()).unwrap();
        let second = store.create(&retro()).unwrap();
        let throwaway = store.create(&standup()).unwrap();
        let first = store
            .update(first.id, &EventPatch::default().title("Daily Standup"))
            .unwrap()
            .unwrap();
        assert!(store.delete(throwaway.id));
        (first, second)
    };

    let snapshots = SqliteSnapshotStore::open(&path).unwrap();
    let raw = snapshots.load().unwrap();
    assert_eq!(
        raw.iter().map(|event| event.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );

    let reopened = EventStore::open_with_system_clock(Box::new(snapshots));
    assert_eq!(reopened.len(), 2);
    let loaded_first = reopened.get(first.id).unwrap();
    assert_eq!(loaded_first, first);
    assert_eq!(loaded_first.title, "Daily Standup");
    assert_eq!(
        loaded_first.created_at.to_string(),
        first.created_at.to_string()
    );

    let loaded_second = reopened.get(second.id).unwrap();
    assert_eq!(loaded_second.start_time.to_string(), "2024-01-01T08:00:00+01:00");
    assert_eq!(loaded_second.recurring.as_deref(), Some("biweekly"));
}

#[test]
fn sqlite_load_skips_invalid_rows_and_keeps_the_rest() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO events (position, id, title, description, start_time, end_time, recurring, created_at)
         VALUES (0, '11111111-2222-4333-8444-555555555555', 'bad', '', 'whenever', '2024-01-01T09:00:00', NULL, '2024-01-01T00:00:00Z');
         INSERT INTO events (position, id, title, description, start_time, end_time, recurring, created_at)
         VALUES (1, '22222222-2222-4333-8444-555555555555', 'reversed', '', '2024-01-01T10:00:00', '2024-01-01T09:00:00', NULL, '2024-01-01T00:00:00Z');
         INSERT INTO events (position, id, title, description, start_time, end_time, recurring, created_at)
         VALUES (2, '33333333-2222-4333-8444-555555555555', 'Keep me', '', '2024-01-01T11:00:00', '2024-01-01T12:00:00', NULL, '2024-01-01T00:00:00Z');",
    )
    .unwrap();

    let snapshots = SqliteSnapshotStore::from_connection(conn);
    let loaded = snapshots.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].title, "Keep me");

    let store = EventStore::open_with_system_clock(Box::new(snapshots));
    assert_eq!(store.len(), 1);
}

#[test]
fn json_record_with_reversed_window_does_not_discard_valid_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    let keep_id = Uuid::new_v4();
    let records = serde_json::json!([
        {
            "id": keep_id,
            "title": "Keep me",
            "description": "",
            "start_time": "2024-01-01T09:00:00",
            "end_time": "2024-01-01T10:00:00",
            "recurring": null,
            "created_at": "2024-01-01T00:00:00Z"
        },
        {
            "id": Uuid::new_v4(),
            "title": "Reversed",
            "description": "",
            "start_time": "2024-01-01T10:00:00",
            "end_time": "2024-01-01T09:00:00",
            "recurring": null,
            "created_at": "2024-01-01T00:00:00Z"
        }
    ]);
    std::fs::write(&path, serde_json::to_string_pretty(&records).unwrap()).unwrap();

    let store = EventStore::open_with_system_clock(Box::new(JsonFileSnapshotStore::new(&path)));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(keep_id).unwrap().title, "Keep me");

    let created = store.create(&standup()).unwrap();
    let reloaded = JsonFileSnapshotStore::new(&path).load().unwrap();
    let ids = reloaded.iter().map(|event| event.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![keep_id, created.id]);
    assert!(!std::fs::read_to_string(&path).unwrap().contains("Reversed"));
}

#[test]
fn json_snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("events.json");

    let created = {
        let store = EventStore::open_with_system_clock(Box::new(JsonFileSnapshotStore::new(&path)));
        store.create(&standup()).unwrap()
    };

    let text = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json[0]["title"], "Standup");
    assert_eq!(json[0]["start_time"], "2024-01-01T09:00:00");
    assert!(!dir.path().join("nested").join("events.json.tmp").exists());

    let reopened = EventStore::open_with_system_clock(Box::new(JsonFileSnapshotStore::new(&path)));
    assert_eq!(reopened.get(created.id).unwrap(), created);
}

#[test]
fn missing_json_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = JsonFileSnapshotStore::new(dir.path().join("absent.json"));
    assert!(snapshots.load().unwrap().is_empty());
}

#[test]
fn corrupted_json_starts_empty_and_recovers_on_next_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let store = EventStore::open_with_system_clock(Box::new(JsonFileSnapshotStore::new(&path)));
    assert!(store.is_empty());

    let created = store.create(&standup()).unwrap();
    let reloaded = JsonFileSnapshotStore::new(&path).load().unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].id, created.id);
}

#[test]
fn store_writes_through_only_on_successful_mutations() {
    let snapshots = RecordingSnapshots::default();
    let store = EventStore::open_with_system_clock(Box::new(snapshots.clone()));

    let created = store.create(&standup()).unwrap();
    assert_eq!(snapshots.saves.load(Ordering::SeqCst), 1);

    let reversed = NewEvent::new("bad", "", "2024-01-02T00:00:00", "2024-01-01T00:00:00");
    assert!(store.create(&reversed).is_err());
    assert_eq!(snapshots.saves.load(Ordering::SeqCst), 1);

    store
        .update(created.id, &EventPatch::default().description("moved"))
        .unwrap();
    assert_eq!(snapshots.saves.load(Ordering::SeqCst), 2);
    assert_eq!(
        snapshots.last_saved.lock().unwrap()[0].description,
        "moved"
    );

    assert!(store
        .update(created.id, &EventPatch::default().end_time("nope"))
        .is_err());
    assert!(!store.delete(Uuid::new_v4()));
    assert_eq!(snapshots.saves.load(Ordering::SeqCst), 2);

    assert!(store.delete(created.id));
    assert_eq!(snapshots.saves.load(Ordering::SeqCst), 3);
    assert!(snapshots.last_saved.lock().unwrap().is_empty());

    let _ = store.list_all();
    let _ = store.search("standup");
    assert_eq!(snapshots.saves.load(Ordering::SeqCst), 3);
}

#[test]
fn persistence_failures_do_not_fail_store_operations() {
    let store = EventStore::open_with_system_clock(Box::new(BrokenSnapshots));
    assert!(store.is_empty());

    let created = store.create(&standup()).unwrap();
    let updated = store
        .update(created.id, &EventPatch::default().title("Still works"))
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Still works");
    assert_eq!(store.list_all(), vec![updated]);
    assert!(store.delete(created.id));
}

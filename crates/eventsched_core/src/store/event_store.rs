//! In-memory event store with write-through snapshot persistence.
//!
//! # Responsibility
//! - Own the event collection and expose CRUD, search and window queries.
//! - Save the full collection after every successful mutation.
//!
//! # Invariants
//! - One coarse lock serializes every operation, including the save call.
//! - Ids are unique inside the collection.
//! - Every stored event satisfies `Event::validate()`.
//! - Persistence failures are logged and never fail the in-memory operation.
//! - Callers only ever receive clones.

use crate::clock::{Clock, SystemClock};
use crate::model::event::{Event, EventId, EventValidationError, NewEvent};
use crate::model::patch::EventPatch;
use crate::snapshot::EventSnapshotStore;
use crate::time::EventTime;
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

pub struct EventStore {
    events: Mutex<Vec<Event>>,
    snapshots: Box<dyn EventSnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl EventStore {
    /// Loads the snapshot once and builds the store around it.
    ///
    /// Load failures start the store empty. Invalid or duplicate records are
    /// dropped with a warning so the in-memory invariants always hold.
    pub fn open(snapshots: Box<dyn EventSnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        let started_at = Instant::now();
        let events = match snapshots.load() {
            Ok(events) => {
                let events = sanitize_loaded(events);
                info!(
                    "event=snapshot_load module=store status=ok backend={} count={} duration_ms={}",
                    snapshots.backend(),
                    events.len(),
                    started_at.elapsed().as_millis()
                );
                events
            }
            Err(err) => {
                error!(
                    "event=snapshot_load module=store status=error backend={} error={} duration_ms={}",
                    snapshots.backend(),
                    err,
                    started_at.elapsed().as_millis()
                );
                Vec::new()
            }
        };

        Self {
            events: Mutex::new(events),
            snapshots,
            clock,
        }
    }

    /// Same as [`EventStore::open`] with wall-clock time.
    pub fn open_with_system_clock(snapshots: Box<dyn EventSnapshotStore>) -> Self {
        Self::open(snapshots, Arc::new(SystemClock))
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Validates input, assigns a fresh id and `created_at`, stores and saves.
    ///
    /// On error the collection is unchanged.
    pub fn create(&self, input: &NewEvent) -> Result<Event, EventValidationError> {
        let created_at = EventTime::from_utc(self.clock.now());
        let mut events = self.lock_events();

        let mut id = Uuid::new_v4();
        while events.iter().any(|event| event.id == id) {
            id = Uuid::new_v4();
        }

        let event = match Event::from_new(id, input, created_at) {
            Ok(event) => event,
            Err(err) => {
                debug!(
                    "event=event_create module=store status=rejected error_code={}",
                    err.error_code()
                );
                return Err(err);
            }
        };

        events.push(event.clone());
        self.persist(&events, "create");
        info!(
            "event=event_create module=store status=ok event_id={} count={}",
            event.id,
            events.len()
        );
        Ok(event)
    }

    /// All events ordered by `start_time`; ties keep insertion order.
    pub fn list_all(&self) -> Vec<Event> {
        let mut events = self.lock_events().clone();
        events.sort_by(|left, right| left.start_time.cmp(&right.start_time));
        events
    }

    pub fn get(&self, id: EventId) -> Option<Event> {
        self.lock_events()
            .iter()
            .find(|event| event.id == id)
            .cloned()
    }

    /// Applies a whitelisted partial update.
    ///
    /// Returns `Ok(None)` when `id` is absent. On error the stored event is
    /// unchanged.
    pub fn update(
        &self,
        id: EventId,
        patch: &EventPatch,
    ) -> Result<Option<Event>, EventValidationError> {
        let mut events = self.lock_events();
        let Some(slot) = events.iter_mut().find(|event| event.id == id) else {
            return Ok(None);
        };

        let updated = match patch.apply_to(slot) {
            Ok(updated) => updated,
            Err(err) => {
                debug!(
                    "event=event_update module=store status=rejected event_id={} error_code={}",
                    id,
                    err.error_code()
                );
                return Err(err);
            }
        };
        *slot = updated.clone();

        self.persist(&events, "update");
        info!("event=event_update module=store status=ok event_id={id}");
        Ok(Some(updated))
    }

    /// Removes the event; returns whether anything was removed.
    pub fn delete(&self, id: EventId) -> bool {
        let mut events = self.lock_events();
        let Some(index) = events.iter().position(|event| event.id == id) else {
            return false;
        };

        events.remove(index);
        self.persist(&events, "delete");
        info!(
            "event=event_delete module=store status=ok event_id={} count={}",
            id,
            events.len()
        );
        true
    }

    /// Case-insensitive substring match on title or description, in
    /// insertion order.
    pub fn search(&self, query: &str) -> Vec<Event> {
        let needle = query.to_lowercase();
        self.lock_events()
            .iter()
            .filter(|event| event.matches_lowercase(&needle))
            .cloned()
            .collect()
    }

    /// Events starting inside `[now, now + lookahead]`, in insertion order.
    pub fn upcoming(&self, lookahead: Duration) -> Vec<Event> {
        if lookahead < Duration::zero() {
            return Vec::new();
        }
        let now = self.clock.now();
        let window_end = now
            .checked_add_signed(lookahead)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.lock_events()
            .iter()
            .filter(|event| {
                let start = event.start_time.instant();
                start >= now && start <= window_end
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock_events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_events().is_empty()
    }

    fn lock_events(&self) -> MutexGuard<'_, Vec<Event>> {
        // Writes happen only after validation; a poisoned guard still holds valid events.
        self.events.lock().unwrap_or_else(|poisoned| {
            warn!("event=store_lock module=store status=recovered reason=poisoned");
            poisoned.into_inner()
        })
    }

    fn persist(&self, events: &[Event], operation: &'static str) {
        let started_at = Instant::now();
        match self.snapshots.save(events) {
            Ok(()) => debug!(
                "event=snapshot_save module=store status=ok backend={} op={} count={} duration_ms={}",
                self.snapshots.backend(),
                operation,
                events.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=snapshot_save module=store status=error backend={} op={} duration_ms={} error={}",
                self.snapshots.backend(),
                operation,
                started_at.elapsed().as_millis(),
                err
            ),
        }
    }
}

fn sanitize_loaded(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::with_capacity(events.len());
    events
        .into_iter()
        .filter(|event| {
            if let Err(err) = event.validate() {
                warn!(
                    "event=snapshot_load module=store status=skipped event_id={} error_code={}",
                    event.id,
                    err.error_code()
                );
                return false;
            }
            if !seen.insert(event.id) {
                warn!(
                    "event=snapshot_load module=store status=skipped event_id={} error_code=duplicate_id",
                    event.id
                );
                return false;
            }
            true
        })
        .collect()
}

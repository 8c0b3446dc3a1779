//! Periodic reminder scan.
//!
//! # Invariants
//! - One tick calls `upcoming(lookahead)` once and notifies every hit once.
//! - No suppression across ticks: an event still inside the window is
//!   notified again on the next tick.
//! - Missed ticks are not replayed.
//! - A panicking notifier is logged and does not end the loop.

use super::notifier::Notifier;
use crate::store::event_store::EventStore;
use log::{debug, error, info};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_LOOKAHEAD_MINUTES: i64 = 60;
const SCANNER_THREAD_NAME: &str = "reminder-scanner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerSettings {
    /// Wall-clock wait between ticks.
    pub interval: Duration,
    /// Width of the `[now, now + lookahead]` window.
    pub lookahead: chrono::Duration,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SCAN_INTERVAL,
            lookahead: chrono::Duration::minutes(DEFAULT_LOOKAHEAD_MINUTES),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Idle,
    Scanning,
    Stopped,
}

impl ScannerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Scanning,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Scanning => 1,
            Self::Stopped => 2,
        }
    }
}

pub struct ReminderScanner {
    store: Arc<EventStore>,
    notifier: Arc<dyn Notifier>,
    settings: ScannerSettings,
}

impl ReminderScanner {
    pub fn new(
        store: Arc<EventStore>,
        notifier: Arc<dyn Notifier>,
        settings: ScannerSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    /// Runs one scan tick and returns how many events were notified.
    pub fn scan_once(&self) -> usize {
        let started_at = Instant::now();
        let due = self.store.upcoming(self.settings.lookahead);

        for event in &due {
            let delivered = catch_unwind(AssertUnwindSafe(|| self.notifier.notify(event)));
            if delivered.is_err() {
                error!(
                    "event=reminder_notify module=reminder status=error event_id={} error_code=notifier_panicked",
                    event.id
                );
            }
        }

        debug!(
            "event=reminder_scan module=reminder status=ok due_count={} duration_ms={}",
            due.len(),
            started_at.elapsed().as_millis()
        );
        due.len()
    }

    /// Starts the periodic loop on a dedicated thread.
    ///
    /// The first tick happens one `interval` after spawning.
    ///
    /// # Errors
    /// - Returns the OS error when the thread cannot be created.
    pub fn spawn(self) -> std::io::Result<ScannerHandle> {
        let shared = Arc::new(ScannerShared::new());
        let thread_shared = Arc::clone(&shared);
        let interval = self.settings.interval;

        let thread = thread::Builder::new()
            .name(SCANNER_THREAD_NAME.to_string())
            .spawn(move || {
                info!(
                    "event=reminder_loop module=reminder status=start interval_ms={} lookahead_s={}",
                    interval.as_millis(),
                    self.settings.lookahead.num_seconds()
                );
                while thread_shared.wait_for_tick(interval) == TickDecision::Tick {
                    thread_shared.set_state(ScannerState::Scanning);
                    self.scan_once();
                    thread_shared.set_state(ScannerState::Idle);
                }
                thread_shared.set_state(ScannerState::Stopped);
                info!("event=reminder_loop module=reminder status=stopped");
            })?;

        Ok(ScannerHandle {
            shared,
            thread: Some(thread),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TickDecision {
    Tick,
    Shutdown,
}

struct ScannerShared {
    stop_requested: Mutex<bool>,
    wake: Condvar,
    state: AtomicU8,
}

impl ScannerShared {
    fn new() -> Self {
        Self {
            stop_requested: Mutex::new(false),
            wake: Condvar::new(),
            state: AtomicU8::new(ScannerState::Idle.as_u8()),
        }
    }

    fn wait_for_tick(&self, interval: Duration) -> TickDecision {
        let deadline = Instant::now() + interval;
        let mut stop_requested = self
            .stop_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        loop {
            if *stop_requested {
                return TickDecision::Shutdown;
            }
            let now = Instant::now();
            if now >= deadline {
                return TickDecision::Tick;
            }
            let (guard, _) = self
                .wake
                .wait_timeout(stop_requested, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            stop_requested = guard;
        }
    }

    fn request_stop(&self) {
        let mut stop_requested = self
            .stop_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *stop_requested = true;
        self.wake.notify_all();
    }

    fn state(&self) -> ScannerState {
        ScannerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ScannerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

/// Owner of a running scan loop. Dropping it stops the loop.
pub struct ScannerHandle {
    shared: Arc<ScannerShared>,
    thread: Option<JoinHandle<()>>,
}

impl ScannerHandle {
    pub fn state(&self) -> ScannerState {
        self.shared.state()
    }

    /// Signals the loop and waits for an in-flight tick to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.shared.request_stop();
        if thread.join().is_err() {
            error!("event=reminder_loop module=reminder status=error error_code=thread_panicked");
        }
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! Reminder delivery boundary.

use crate::logging::sanitize_message;
use crate::model::event::Event;
use log::info;

const MAX_TITLE_CHARS: usize = 120;

/// Delivers one reminder for one event.
///
/// Implementations own their delivery failures; the scanner only decides
/// which events qualify and when.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Event);
}

/// Writes a `REMINDER` line to the core log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Event) {
        info!("{}", reminder_line(event));
    }
}

fn reminder_line(event: &Event) -> String {
    format!(
        "event=reminder module=reminder status=due event_id={} REMINDER: {} starts at {}",
        event.id,
        sanitize_message(&event.title, MAX_TITLE_CHARS),
        event.start_time
    )
}

impl<F> Notifier for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn notify(&self, event: &Event) {
        self(event)
    }
}

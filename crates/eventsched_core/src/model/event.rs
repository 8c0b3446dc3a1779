//! Event domain model.
//!
//! # Responsibility
//! - Define the single calendar entity owned by the event store.
//! - Validate creation input and decoded records against model invariants.
//!
//! # Invariants
//! - `id` is a non-nil UUID, never reused for another event.
//! - `title` is non-empty after trimming.
//! - `start_time < end_time`.
//! - `created_at` is set once at creation and never changes.

use crate::time::{parse_event_time, EventTime, ParseError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one event.
pub type EventId = Uuid;

/// Validation failure for event creation, update or decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    /// A required input field is absent or blank.
    MissingField(&'static str),
    /// Title would become blank.
    EmptyTitle,
    /// A time field could not be parsed.
    InvalidTime {
        field: &'static str,
        source: ParseError,
    },
    /// `start_time` is not strictly before `end_time`.
    InvalidWindow { start: EventTime, end: EventTime },
    /// Nil UUID is reserved and never a valid event id.
    NilId,
}

impl EventValidationError {
    /// Stable machine-readable code used in log lines.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::EmptyTitle => "empty_title",
            Self::InvalidTime { .. } => "invalid_time",
            Self::InvalidWindow { .. } => "invalid_window",
            Self::NilId => "nil_id",
        }
    }
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::InvalidTime { field, source } => write!(f, "invalid {field}: {source}"),
            Self::InvalidWindow { start, end } => {
                write!(f, "start_time ({start}) must be before end_time ({end})")
            }
            Self::NilId => write!(f, "event id must not be nil"),
        }
    }
}

impl Error for EventValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTime { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Creation input in raw text form, before parsing and validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    /// Opaque recurrence tag, stored verbatim.
    pub recurring: Option<String>,
}

impl NewEvent {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            recurring: None,
        }
    }

    pub fn with_recurring(mut self, recurring: impl Into<String>) -> Self {
        self.recurring = Some(recurring.into());
        self
    }
}

/// Stored calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub start_time: EventTime,
    pub end_time: EventTime,
    pub recurring: Option<String>,
    pub created_at: EventTime,
}

impl Event {
    /// Builds a validated event from raw creation input.
    ///
    /// # Errors
    /// - `MissingField` for blank title/start/end text.
    /// - `InvalidTime` when start or end text does not parse.
    /// - `InvalidWindow` when start is not before end.
    pub fn from_new(
        id: EventId,
        input: &NewEvent,
        created_at: EventTime,
    ) -> Result<Self, EventValidationError> {
        if input.title.trim().is_empty() {
            return Err(EventValidationError::MissingField("title"));
        }
        let start_time = parse_required_time("start_time", &input.start_time)?;
        let end_time = parse_required_time("end_time", &input.end_time)?;

        let event = Self {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            start_time,
            end_time,
            recurring: input.recurring.clone(),
            created_at,
        };
        event.validate()?;
        Ok(event)
    }

    /// Checks model invariants on an already-typed event.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.id.is_nil() {
            return Err(EventValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(EventValidationError::EmptyTitle);
        }
        check_window(self.start_time, self.end_time)
    }

    /// Returns whether `needle` (already lowercased) occurs in title or
    /// description, ignoring case.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Ensures `start < end`.
pub fn check_window(start: EventTime, end: EventTime) -> Result<(), EventValidationError> {
    if start < end {
        Ok(())
    } else {
        Err(EventValidationError::InvalidWindow { start, end })
    }
}

pub(crate) fn parse_time_field(
    field: &'static str,
    text: &str,
) -> Result<EventTime, EventValidationError> {
    parse_event_time(text).map_err(|source| EventValidationError::InvalidTime { field, source })
}

fn parse_required_time(
    field: &'static str,
    text: &str,
) -> Result<EventTime, EventValidationError> {
    if text.trim().is_empty() {
        return Err(EventValidationError::MissingField(field));
    }
    parse_time_field(field, text)
}

#[derive(Deserialize)]
struct EventRecord {
    id: EventId,
    title: String,
    #[serde(default)]
    description: String,
    start_time: EventTime,
    end_time: EventTime,
    #[serde(default)]
    recurring: Option<String>,
    created_at: EventTime,
}

impl TryFrom<EventRecord> for Event {
    type Error = EventValidationError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let event = Self {
            id: record.id,
            title: record.title,
            description: record.description,
            start_time: record.start_time,
            end_time: record.end_time,
            recurring: record.recurring,
            created_at: record.created_at,
        };
        event.validate()?;
        Ok(event)
    }
}

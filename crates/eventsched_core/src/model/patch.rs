//! Partial update for stored events.
//!
//! Only the fields listed in [`EventPatch::MUTABLE_FIELDS`] can change.
//! `id` and `created_at` are not representable here, and unknown keys in a
//! decoded patch are ignored.

use super::event::{check_window, parse_time_field, Event, EventValidationError};
use serde::{Deserialize, Deserializer};

/// Whitelisted partial update.
///
/// `None` means "keep the stored value". For `recurring`, `Some(None)` clears
/// the tag, which is how an explicit JSON `null` decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub recurring: Option<Option<String>>,
}

impl EventPatch {
    /// Field names a patch may carry.
    pub const MUTABLE_FIELDS: [&'static str; 5] =
        ["title", "description", "start_time", "end_time", "recurring"];

    pub fn title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    pub fn description(mut self, value: impl Into<String>) -> Self {
        self.description = Some(value.into());
        self
    }

    pub fn start_time(mut self, value: impl Into<String>) -> Self {
        self.start_time = Some(value.into());
        self
    }

    pub fn end_time(mut self, value: impl Into<String>) -> Self {
        self.end_time = Some(value.into());
        self
    }

    pub fn recurring(mut self, value: Option<String>) -> Self {
        self.recurring = Some(value);
        self
    }

    /// Returns whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.recurring.is_none()
    }

    /// Computes the patched copy of `event` without touching the original.
    ///
    /// The time window is re-checked against the resulting combination, so
    /// updating only one bound is validated against the retained other one.
    pub fn apply_to(&self, event: &Event) -> Result<Event, EventValidationError> {
        let mut updated = event.clone();

        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(EventValidationError::EmptyTitle);
            }
            updated.title = title.clone();
        }
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(text) = &self.start_time {
            updated.start_time = parse_time_field("start_time", text)?;
        }
        if let Some(text) = &self.end_time {
            updated.end_time = parse_time_field("end_time", text)?;
        }
        if let Some(recurring) = &self.recurring {
            updated.recurring = recurring.clone();
        }

        if self.start_time.is_some() || self.end_time.is_some() {
            check_window(updated.start_time, updated.end_time)?;
        }
        Ok(updated)
    }
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

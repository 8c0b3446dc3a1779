//! Canonical time values for event scheduling.
//!
//! # Responsibility
//! - Define the comparable time value stored on every event.
//! - Parse flexible user-provided timestamps into that value.
//!
//! # Invariants
//! - Naive values are wall-clock times in the host's local zone. A wall time
//!   repeated by a DST fold resolves to its earlier instant; one skipped by a
//!   DST gap resolves with the offset in force just before the gap.
//! - Equality and ordering only look at the UTC instant, so naive and zoned
//!   values compare without ambiguity.
//! - `parse_event_time(t.to_string()) == t` for every `EventTime`.

mod parse;

pub use parse::{parse_event_time, ParseError};

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const NAIVE_CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Point in time attached to an event.
///
/// Keeps the shape the caller wrote (local wall time, or an explicit
/// offset) so the value renders back the way it was given.
#[derive(Debug, Clone, Copy)]
pub struct EventTime {
    instant: DateTime<Utc>,
    written: Written,
}

#[derive(Debug, Clone, Copy)]
enum Written {
    LocalWall(NaiveDateTime),
    Offset(FixedOffset),
}

impl EventTime {
    /// Builds a zoned UTC value, rendered with a `Z` suffix.
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            written: Written::Offset(Utc.fix()),
        }
    }

    /// Builds a naive value from a wall time in the host's local zone.
    pub fn naive(value: NaiveDateTime) -> Self {
        Self {
            instant: resolve_local_wall(value),
            written: Written::LocalWall(value),
        }
    }

    /// Builds a zoned value that keeps its written offset for rendering.
    pub fn zoned(value: DateTime<FixedOffset>) -> Self {
        Self {
            instant: value.with_timezone(&Utc),
            written: Written::Offset(*value.offset()),
        }
    }

    /// UTC instant used for every comparison.
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// Returns whether the source text carried no offset.
    pub fn is_naive(&self) -> bool {
        matches!(self.written, Written::LocalWall(_))
    }

    /// Canonical string form, accepted back by [`parse_event_time`].
    pub fn to_canonical_string(&self) -> String {
        match self.written {
            Written::LocalWall(wall) => wall.format(NAIVE_CANONICAL_FORMAT).to_string(),
            Written::Offset(offset) => self
                .instant
                .with_timezone(&offset)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }
}

fn resolve_local_wall(wall: NaiveDateTime) -> DateTime<Utc> {
    if let Some(resolved) = Local.from_local_datetime(&wall).earliest() {
        return resolved.with_timezone(&Utc);
    }
    let offset_before_gap = Local.offset_from_utc_datetime(&(wall - Duration::days(1)).and_utc().naive_utc());
    (wall - Duration::seconds(i64::from(offset_before_gap.local_minus_utc()))).and_utc()
}

impl PartialEq for EventTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for EventTime {}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl Hash for EventTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant.hash(state);
    }
}

impl Display for EventTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for EventTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_event_time(s)
    }
}

impl Serialize for EventTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_event_time(&text).map_err(D::Error::custom)
    }
}

//! Flexible timestamp parsing.
//!
//! Tries zoned ISO-8601 forms first, then naive date-times, then bare dates.
//! Human-readable month-name and US slash forms are accepted in both naive
//! lists. Ordinal day suffixes (`1st`, `22nd`) are stripped before matching.

use super::EventTime;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static ORDINAL_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid ordinal suffix regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d %Y %I:%M %p",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%d %B %Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%B %d %Y", "%d %B %Y", "%m/%d/%Y"];

/// Timestamp text could not be turned into an [`EventTime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty or only whitespace.
    Empty,
    /// Input did not match any supported date/time shape.
    Unrecognized(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "timestamp is empty"),
            Self::Unrecognized(text) => write!(f, "unrecognized timestamp `{text}`"),
        }
    }
}

impl Error for ParseError {}

/// Parses user-provided timestamp text.
///
/// # Errors
/// - [`ParseError::Empty`] for blank input.
/// - [`ParseError::Unrecognized`] when no supported format matches.
pub fn parse_event_time(text: &str) -> Result<EventTime, ParseError> {
    let normalized = normalize_input(text);
    if normalized.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(EventTime::zoned(value));
    }

    if let Some(value) = ZONED_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&normalized, format).ok())
    {
        return Ok(EventTime::zoned(value));
    }

    if let Some(value) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
    {
        return Ok(EventTime::naive(value));
    }

    if let Some(value) = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&normalized, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(EventTime::naive(value));
    }

    Err(ParseError::Unrecognized(text.trim().to_string()))
}

fn normalize_input(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ");
    ORDINAL_SUFFIX_RE.replace_all(&collapsed, "$1").into_owned()
}

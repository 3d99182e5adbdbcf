//! Date parsing collaborator
//!
//! The photo API sends creation dates as strings. Turning them into
//! timestamps is pluggable; a parse failure yields `None`, never an error.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Converts a wire date string into a UTC timestamp
pub trait DateParser: Send + Sync {
    /// Parse `value`, returning `None` when it is not a recognised date
    fn parse(&self, value: &str) -> Option<DateTime<Utc>>;
}

/// Parses RFC 3339 timestamps (`2016-05-03T11:00:28-04:00`)
///
/// Offset-less timestamps (`2016-05-03T11:00:28`) are accepted and read as UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3339DateParser;

impl DateParser for Rfc3339DateParser {
    fn parse(&self, value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl<F> DateParser for F
where
    F: Fn(&str) -> Option<DateTime<Utc>> + Send + Sync,
{
    fn parse(&self, value: &str) -> Option<DateTime<Utc>> {
        self(value)
    }
}

//! Time types for calendar events and annotation queries.
//!
//! This module provides [`EventTime`] for representing event boundaries
//! (which may be either a specific datetime or an all-day date), and
//! [`TimeRange`] for the window an annotation query covers.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Represents the time of a calendar event boundary.
///
/// Calendar events carry two kinds of times:
/// - **DateTime**: A specific point in time (with timezone, stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Converts to a UTC datetime.
    ///
    /// All-day dates resolve to midnight UTC, so record times do not
    /// depend on the host machine's timezone.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_hms_opt(0, 0, 0).expect("valid time").and_utc(),
        }
    }

    /// Returns this time as milliseconds since the Unix epoch.
    ///
    /// This is the representation annotation hosts plot against.
    pub fn timestamp_millis(&self) -> i64 {
        self.to_utc_datetime().timestamp_millis()
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// The time window an annotation query covers.
///
/// Both ends are inclusive; the range is forwarded verbatim to the
/// calendar API as `timeMin`/`timeMax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub from: DateTime<Utc>,
    /// End of the range (inclusive).
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new time range.
    ///
    /// # Panics
    ///
    /// Panics if `from` is after `to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        assert!(from <= to, "TimeRange from must be <= to");
        Self { from, to }
    }

    /// Creates a range from a start time and duration.
    pub fn from_duration(from: DateTime<Utc>, duration: Duration) -> Self {
        Self::new(from, from + duration)
    }

    /// Returns the length of this range.
    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    /// Checks if a datetime falls within this range (inclusive).
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.from <= dt && dt <= self.to
    }
}

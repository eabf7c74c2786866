//! Wire types for Google Calendar events.
//!
//! Field names follow the Calendar v3 JSON representation. Every field is
//! optional on the wire; resolution to concrete [`EventTime`] values
//! happens in [`EventDateTime::resolve`], and events that cannot be
//! resolved are dealt with by the annotation mapping layer.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use calanno_core::EventTime;

/// One event as returned by the `events.list` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarEvent {
    pub id: Option<String>,
    /// Event title.
    pub summary: Option<String>,
    /// Free-form event body.
    pub description: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
    pub status: Option<String>,
    pub html_link: Option<String>,
}

impl CalendarEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_start(mut self, start: EventDateTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: EventDateTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Resolved start boundary, when present and parseable.
    pub fn start_time(&self) -> Option<EventTime> {
        self.start.as_ref()?.resolve()
    }

    /// Resolved end boundary, when present and parseable.
    pub fn end_time(&self) -> Option<EventTime> {
        self.end.as_ref()?.resolve()
    }
}

/// Start or end marker of an event.
///
/// Timed events carry `dateTime` (RFC 3339 with offset); all-day events
/// carry `date` (`YYYY-MM-DD`) instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// Timed boundary from an RFC 3339 timestamp.
    pub fn date_time(value: impl Into<String>) -> Self {
        Self {
            date_time: Some(value.into()),
            ..Self::default()
        }
    }

    /// All-day boundary from a `YYYY-MM-DD` date.
    pub fn date(value: impl Into<String>) -> Self {
        Self {
            date: Some(value.into()),
            ..Self::default()
        }
    }

    /// Parses the marker into an [`EventTime`].
    ///
    /// `dateTime` wins over `date` when both are set, matching how the
    /// service populates the two fields. Returns `None` when neither
    /// field parses.
    pub fn resolve(&self) -> Option<EventTime> {
        if let Some(value) = &self.date_time
            && let Ok(parsed) = DateTime::parse_from_rfc3339(value)
        {
            return Some(EventTime::from_local(parsed));
        }
        if let Some(value) = &self.date
            && let Ok(parsed) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        {
            return Some(EventTime::from_date(parsed));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parses_timed_event_from_wire_json() {
        let json = r#"{
            "id": "evt1",
            "summary": "Deploy window",
            "description": "v2.4 rollout",
            "start": {"dateTime": "2021-01-01T10:00:00Z"},
            "end": {"dateTime": "2021-01-01T11:00:00Z"},
            "htmlLink": "https://calendar.google.com/event?eid=abc"
        }"#;

        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id.as_deref(), Some("evt1"));
        assert_eq!(event.summary.as_deref(), Some("Deploy window"));
        assert_eq!(
            event.html_link.as_deref(),
            Some("https://calendar.google.com/event?eid=abc")
        );
        assert_eq!(
            event.start_time(),
            Some(EventTime::from_utc(
                Utc.with_ymd_and_hms(2021, 1, 1, 10, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn parses_all_day_event() {
        let json = r#"{
            "id": "evt2",
            "summary": "Company holiday",
            "start": {"date": "2021-01-02"},
            "end": {"date": "2021-01-03"}
        }"#;

        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        let start = event.start_time().unwrap();
        assert!(start.is_all_day());
        assert_eq!(start.timestamp_millis(), 1_609_545_600_000);
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let marker = EventDateTime::date_time("2021-01-01T12:00:00+02:00");
        assert_eq!(
            marker.resolve(),
            Some(EventTime::from_utc(
                Utc.with_ymd_and_hms(2021, 1, 1, 10, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn date_time_wins_over_date() {
        let marker = EventDateTime {
            date_time: Some("2021-01-01T10:00:00Z".to_string()),
            date: Some("2021-06-30".to_string()),
            time_zone: None,
        };
        assert!(!marker.resolve().unwrap().is_all_day());
    }

    #[test]
    fn unparseable_markers_resolve_to_none() {
        assert_eq!(EventDateTime::date_time("yesterday-ish").resolve(), None);
        assert_eq!(EventDateTime::date("01/02/2021").resolve(), None);
        assert_eq!(EventDateTime::default().resolve(), None);
    }

    #[test]
    fn missing_boundaries_are_none() {
        let event = CalendarEvent::new("evt3").with_summary("No times");
        assert_eq!(event.start_time(), None);
        assert_eq!(event.end_time(), None);
    }
}

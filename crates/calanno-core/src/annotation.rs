//! Annotation types for dashboard event overlays.
//!
//! This module provides the types exchanged with an annotation-consuming
//! host:
//! - [`Annotation`]: The descriptor a dashboard sends with a query
//! - [`AnnotationQuery`]: A descriptor plus the time range to search
//! - [`AnnotationEvent`]: One rendered annotation record
//! - [`Boundary`]: Which edge of a calendar event a record marks

use serde::{Deserialize, Serialize};

use crate::time::TimeRange;

/// An annotation descriptor as configured on a dashboard.
///
/// Only `calendar_id` is interpreted here; any other fields the host
/// attaches are carried in `extra` and echoed back untouched on every
/// record produced for this descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Display name of the annotation layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The calendar to read events from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    /// Passthrough for host-specific fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Annotation {
    /// Creates an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a descriptor targeting the given calendar.
    pub fn for_calendar(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: Some(calendar_id.into()),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the target calendar id, treating blank values as unset.
    pub fn calendar_id(&self) -> Option<&str> {
        self.calendar_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A query for annotation records: which descriptor, over which range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationQuery {
    /// The descriptor to resolve.
    pub annotation: Annotation,
    /// The time range to search, inclusive on both ends.
    pub range: TimeRange,
}

impl AnnotationQuery {
    /// Creates a new query.
    pub fn new(annotation: Annotation, range: TimeRange) -> Self {
        Self { annotation, range }
    }
}

/// Which edge of a calendar event an annotation record marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// The event's start time.
    Start,
    /// The event's end time.
    End,
}

impl Boundary {
    /// Returns the tag string attached to records for this boundary.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One annotation record produced for a dashboard.
///
/// Every calendar event yields two of these: one tagged `start`, one
/// tagged `end`. `time` is milliseconds since the Unix epoch, which is
/// what annotation hosts plot against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEvent {
    /// The descriptor this record answers, echoed back for the host.
    pub annotation: Annotation,
    /// Boundary time in milliseconds since the Unix epoch.
    pub time: i64,
    /// Event summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Boundary tags, `["start"]` or `["end"]`.
    pub tags: Vec<String>,
    /// Event description body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl AnnotationEvent {
    /// Creates a record for one event boundary.
    pub fn new(annotation: Annotation, boundary: Boundary, time: i64) -> Self {
        Self {
            annotation,
            time,
            title: None,
            tags: vec![boundary.tag().to_string()],
            text: None,
        }
    }

    /// Sets the record title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the record body text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Returns true if this record marks an event start.
    pub fn is_start(&self) -> bool {
        self.tags.iter().any(|t| t == Boundary::Start.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod descriptor {
        use super::*;

        #[test]
        fn blank_calendar_ids_are_unset() {
            assert_eq!(Annotation::new().calendar_id(), None);
            assert_eq!(Annotation::for_calendar("").calendar_id(), None);
            assert_eq!(Annotation::for_calendar("   ").calendar_id(), None);
            assert_eq!(Annotation::for_calendar(" c1 ").calendar_id(), Some("c1"));
        }

        #[test]
        fn serde_uses_camel_case() {
            let annotation = Annotation::for_calendar("team@example.com").with_name("Team");
            let json = serde_json::to_value(&annotation).unwrap();
            assert_eq!(json["calendarId"], "team@example.com");
            assert_eq!(json["name"], "Team");
        }

        #[test]
        fn unknown_fields_round_trip() {
            let json = r#"{"name":"Ops","calendarId":"c1","iconColor":"red","enable":true}"#;
            let annotation: Annotation = serde_json::from_str(json).unwrap();
            assert_eq!(annotation.calendar_id(), Some("c1"));
            assert_eq!(annotation.extra["iconColor"], "red");
            assert_eq!(annotation.extra["enable"], true);

            let back = serde_json::to_value(&annotation).unwrap();
            assert_eq!(back["iconColor"], "red");
            assert_eq!(back["enable"], true);
        }
    }

    mod records {
        use super::*;

        #[test]
        fn boundary_tags() {
            assert_eq!(Boundary::Start.tag(), "start");
            assert_eq!(Boundary::End.tag(), "end");
            assert_eq!(Boundary::End.to_string(), "end");
        }

        #[test]
        fn record_shape() {
            let record = AnnotationEvent::new(Annotation::for_calendar("c1"), Boundary::Start, 1_000)
                .with_title("Sync")
                .with_text("d");

            assert!(record.is_start());
            let json = serde_json::to_value(&record).unwrap();
            assert_eq!(json["time"], 1_000);
            assert_eq!(json["title"], "Sync");
            assert_eq!(json["text"], "d");
            assert_eq!(json["tags"], serde_json::json!(["start"]));
            assert_eq!(json["annotation"]["calendarId"], "c1");
        }

        #[test]
        fn absent_title_and_text_are_omitted() {
            let record = AnnotationEvent::new(Annotation::new(), Boundary::End, 0);
            assert!(!record.is_start());
            let json = serde_json::to_value(&record).unwrap();
            assert!(json.get("title").is_none());
            assert!(json.get("text").is_none());
            assert_eq!(json["tags"], serde_json::json!(["end"]));
        }
    }
}

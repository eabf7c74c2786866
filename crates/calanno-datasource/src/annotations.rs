//! Flattens calendar events into annotation records.
//!
//! Each event contributes a start record and an end record, in that
//! order, and events keep their upstream ordering in the flattened
//! output. An event missing either boundary produces nothing.

use tracing::warn;

use calanno_core::{Annotation, AnnotationEvent, Boundary};

use crate::events::CalendarEvent;

/// Maps a batch of events to annotation records, two per event.
pub fn annotations_for_events(
    annotation: &Annotation,
    events: &[CalendarEvent],
) -> Vec<AnnotationEvent> {
    events
        .iter()
        .filter_map(|event| boundary_records(annotation, event))
        .flatten()
        .collect()
}

/// Builds the start and end records for one event.
///
/// Returns `None` when either boundary is absent or unparseable; a record
/// for only one edge of an event would render as a spurious point
/// annotation.
pub fn boundary_records(
    annotation: &Annotation,
    event: &CalendarEvent,
) -> Option<[AnnotationEvent; 2]> {
    let (Some(start), Some(end)) = (event.start_time(), event.end_time()) else {
        warn!(
            "skipping event {} without usable start and end times",
            event.id.as_deref().unwrap_or("<unknown>")
        );
        return None;
    };

    let record = |boundary: Boundary, millis: i64| {
        let mut record = AnnotationEvent::new(annotation.clone(), boundary, millis);
        record.title = event.summary.clone();
        record.text = event.description.clone();
        record
    };

    Some([
        record(Boundary::Start, start.timestamp_millis()),
        record(Boundary::End, end.timestamp_millis()),
    ])
}

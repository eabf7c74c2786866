//! Core types: annotations, event times, query ranges, tracing setup

pub mod annotation;
pub mod time;
pub mod tracing;

pub use annotation::{Annotation, AnnotationEvent, AnnotationQuery, Boundary};
pub use time::{EventTime, TimeRange};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};

//! Calendar annotation datasource.
//!
//! Adapts Google Calendar into annotation records a dashboard host can
//! overlay on panels. The crate is split along the seam a host would
//! mock:
//!
//! ```text
//!   AnnotationQuery -> CalendarDatasource -> Session -> CalendarApi
//!                            |                             |
//!                      annotations.rs               google::GoogleApi
//!                  (events -> records)           (OAuth + REST client)
//! ```
//!
//! [`CalendarDatasource`] drives the host-facing operations. [`Session`]
//! guarantees the load/init/sign-in pipeline runs at most once at a
//! time. [`CalendarApi`] is the transport trait; [`google::GoogleApi`]
//! is the production implementation, and tests substitute scripted
//! clients.

pub mod annotations;
pub mod api;
pub mod datasource;
pub mod error;
pub mod events;
pub mod google;
pub mod session;
pub mod settings;

pub use annotations::{annotations_for_events, boundary_records};
pub use api::{AuthStatus, BoxFuture, CalendarApi, ClientConfig, EventsQuery, OrderBy};
pub use datasource::{CalendarDatasource, ConnectionStatus};
pub use error::{DatasourceError, DatasourceResult};
pub use events::{CalendarEvent, EventDateTime};
pub use session::{InitPhase, Session};
pub use settings::{InstanceSettings, JsonData, SecureJsonData};

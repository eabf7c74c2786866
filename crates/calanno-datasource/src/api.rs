//! Calendar API client abstraction.
//!
//! A [`CalendarApi`] hides the transport behind the datasource: the real
//! implementation talks OAuth and HTTP to Google, while tests substitute a
//! scripted client. The trait mirrors the lifecycle the datasource drives:
//! load the client, initialize it against a configuration, check or
//! establish a session, then list events.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use url::Url;

use calanno_core::TimeRange;

use crate::error::DatasourceResult;
use crate::events::CalendarEvent;

/// Boxed future type used by client trait methods.
///
/// Trait methods cannot be `async fn` if the trait needs to be
/// object-safe, so implementations return boxed futures instead.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether the client currently holds a usable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    SignedIn,
    SignedOut,
}

impl AuthStatus {
    pub fn is_signed_in(self) -> bool {
        matches!(self, Self::SignedIn)
    }
}

/// Configuration handed to [`CalendarApi::init_client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// OAuth client id issued by the Google API console.
    pub client_id: String,
    /// OAuth scope requested for the session.
    pub scope: String,
    /// Discovery documents describing the services the client talks to.
    pub discovery_docs: Vec<String>,
}

impl ClientConfig {
    /// Read-only calendar access, the only scope the datasource needs.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    /// Discovery document for the Calendar v3 API.
    pub const CALENDAR_DISCOVERY_DOC: &'static str =
        "https://www.googleapis.com/discovery/v1/apis/calendar/v3/rest";

    /// Creates a configuration with the default scope and discovery document.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scope: Self::DEFAULT_SCOPE.to_string(),
            discovery_docs: vec![Self::CALENDAR_DISCOVERY_DOC.to_string()],
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_discovery_docs(mut self, docs: Vec<String>) -> Self {
        self.discovery_docs = docs;
        self
    }

    /// Checks the configuration for problems that would make every
    /// initialization attempt fail.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required".to_string());
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com".to_string());
        }
        if self.scope.trim().is_empty() {
            return Err("an OAuth scope is required".to_string());
        }
        if self.discovery_docs.is_empty() {
            return Err("at least one discovery document is required".to_string());
        }
        for doc in &self.discovery_docs {
            if let Err(e) = Url::parse(doc) {
                return Err(format!("invalid discovery document URL {doc}: {e}"));
            }
        }
        Ok(())
    }
}

/// How the service orders returned events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    StartTime,
    Updated,
}

impl OrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartTime => "startTime",
            Self::Updated => "updated",
        }
    }
}

/// Parameters for a single [`CalendarApi::list_events`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsQuery {
    /// Calendar to list, e.g. `primary` or an email-style calendar id.
    pub calendar_id: String,
    /// Lower bound (exclusive) on event end time.
    pub time_min: DateTime<Utc>,
    /// Upper bound (exclusive) on event start time.
    pub time_max: DateTime<Utc>,
    /// Include events that have been deleted.
    pub show_deleted: bool,
    /// Expand recurring events into their instances.
    pub single_events: bool,
    /// Maximum number of events returned in one page.
    pub max_results: u32,
    pub order_by: OrderBy,
}

impl EventsQuery {
    /// Page size used for annotation lookups.
    pub const ANNOTATION_MAX_RESULTS: u32 = 250;

    /// The fixed query shape annotation lookups use: expanded recurring
    /// events, no deleted entries, ordered by start time.
    pub fn annotations(calendar_id: impl Into<String>, range: TimeRange) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min: range.from,
            time_max: range.to,
            show_deleted: false,
            single_events: true,
            max_results: Self::ANNOTATION_MAX_RESULTS,
            order_by: OrderBy::StartTime,
        }
    }
}

/// Transport-level client for a calendar service.
///
/// Methods take `&self`; implementations guard their own mutable state.
/// Options are taken by value so the returned futures borrow nothing but
/// the client itself.
pub trait CalendarApi: Send + Sync {
    /// Makes the client usable. Idempotent; later calls are cheap no-ops.
    fn load(&self) -> BoxFuture<'_, DatasourceResult<()>>;

    /// Binds the client to an application configuration, resolving service
    /// endpoints from the discovery documents.
    fn init_client(&self, config: ClientConfig) -> BoxFuture<'_, DatasourceResult<()>>;

    /// Reports whether a usable session already exists, without any
    /// interaction.
    fn auth_status(&self) -> BoxFuture<'_, DatasourceResult<AuthStatus>>;

    /// Runs the interactive sign-in flow and resolves once it settles.
    ///
    /// Resolves `Ok(SignedOut)` when the user declined or the flow did not
    /// produce a session; `Err` is reserved for problems that make the
    /// flow impossible to start, such as missing credentials.
    fn sign_in(&self) -> BoxFuture<'_, DatasourceResult<AuthStatus>>;

    /// Lists events from one calendar. Requires a prior successful
    /// [`load`](Self::load) and [`init_client`](Self::init_client).
    fn list_events(&self, query: EventsQuery) -> BoxFuture<'_, DatasourceResult<Vec<CalendarEvent>>>;
}

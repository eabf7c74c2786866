//! HTTP plumbing for the Calendar v3 service.
//!
//! Endpoints come from the discovery documents named in the client
//! configuration; the published base URL is only a fallback for documents
//! that omit their endpoint fields. Event listing is a single GET with
//! the service's camelCase query parameters.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::api::EventsQuery;
use crate::error::{DatasourceError, DatasourceResult};
use crate::events::CalendarEvent;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";

/// Resolved service endpoints for one calendar backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    base_url: String,
}

impl ServiceEndpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the `events.list` endpoint for one calendar.
    pub fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self::new(CALENDAR_API_BASE)
    }
}

/// The subset of a discovery document the client needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveryDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    root_url: Option<String>,
    #[serde(default)]
    service_path: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
}

impl DiscoveryDocument {
    fn endpoints(&self) -> Option<ServiceEndpoints> {
        if let Some(base) = &self.base_url {
            return Some(ServiceEndpoints::new(base.clone()));
        }
        match (&self.root_url, &self.service_path) {
            (Some(root), Some(path)) => Some(ServiceEndpoints::new(format!(
                "{}/{}",
                root.trim_end_matches('/'),
                path.trim_start_matches('/')
            ))),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        format!(
            "{} {}",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.version.as_deref().unwrap_or("?")
        )
    }
}

/// Fetches every configured discovery document and resolves the service
/// endpoints from the first one that names them.
///
/// All documents are fetched even though only the first contributes
/// endpoints; a dead document URL should fail initialization rather
/// than surface later as a broken query.
pub async fn discover_endpoints(
    http: &reqwest::Client,
    discovery_docs: &[String],
) -> DatasourceResult<ServiceEndpoints> {
    let mut endpoints = None;
    for url in discovery_docs {
        let doc = fetch_discovery_document(http, url).await?;
        debug!("loaded discovery document {}", doc.describe());
        if endpoints.is_none() {
            endpoints = doc.endpoints();
        }
    }
    Ok(endpoints.unwrap_or_default())
}

async fn fetch_discovery_document(
    http: &reqwest::Client,
    url: &str,
) -> DatasourceResult<DiscoveryDocument> {
    let response = http.get(url).send().await.map_err(|e| {
        DatasourceError::Init(format!("discovery document fetch failed: {e}"))
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DatasourceError::Init(format!(
            "discovery document fetch failed ({status}): {url}"
        )));
    }

    let body = response.text().await.map_err(|e| {
        DatasourceError::Init(format!("failed to read discovery document: {e}"))
    })?;
    serde_json::from_str(&body)
        .map_err(|e| DatasourceError::Init(format!("failed to parse discovery document: {e}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<CalendarEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Lists events from one calendar with a single request.
pub async fn list_events(
    http: &reqwest::Client,
    endpoints: &ServiceEndpoints,
    access_token: &str,
    query: &EventsQuery,
) -> DatasourceResult<Vec<CalendarEvent>> {
    let url = endpoints.events_url(&query.calendar_id);
    debug!("listing events from {}", url);

    let response = http
        .get(&url)
        .bearer_auth(access_token)
        .query(&[
            ("timeMin", query.time_min.to_rfc3339()),
            ("timeMax", query.time_max.to_rfc3339()),
            ("showDeleted", query.show_deleted.to_string()),
            ("singleEvents", query.single_events.to_string()),
            ("maxResults", query.max_results.to_string()),
            ("orderBy", query.order_by.as_str().to_string()),
        ])
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                DatasourceError::Query("request timeout".to_string())
            } else if e.is_connect() {
                DatasourceError::Query(format!("connection failed: {e}"))
            } else {
                DatasourceError::Query(format!("request failed: {e}"))
            }
        })?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(DatasourceError::Auth(
            "access token expired or invalid".to_string(),
        ));
    }
    if status == StatusCode::FORBIDDEN {
        return Err(DatasourceError::Query(format!(
            "access denied to calendar {}",
            query.calendar_id
        )));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let hint = retry_after
            .map(|secs| format!(", retry after {secs} seconds"))
            .unwrap_or_default();
        return Err(DatasourceError::Query(format!("rate limit exceeded{hint}")));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(DatasourceError::Query(format!(
            "API error ({status}): {body}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| DatasourceError::Query(format!("failed to read response: {e}")))?;
    let list: EventListResponse = serde_json::from_str(&body)
        .map_err(|e| DatasourceError::Query(format!("failed to parse response: {e}")))?;

    if list.next_page_token.is_some() {
        debug!(
            "calendar {} has more events beyond the first page",
            query.calendar_id
        );
    }
    debug!(
        "fetched {} events from calendar {}",
        list.items.len(),
        query.calendar_id
    );
    Ok(list.items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_url_escapes_the_calendar_id() {
        let endpoints = ServiceEndpoints::default();
        assert_eq!(
            endpoints.events_url("team@example.com"),
            "https://www.googleapis.com/calendar/v3/calendars/team%40example.com/events"
        );
        assert_eq!(
            endpoints.events_url("primary"),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events"
        );
    }

    #[test]
    fn base_url_gains_a_trailing_slash() {
        let endpoints = ServiceEndpoints::new("https://example.com/calendar/v3");
        assert_eq!(endpoints.base_url(), "https://example.com/calendar/v3/");
    }

    #[test]
    fn discovery_prefers_base_url() {
        let doc: DiscoveryDocument = serde_json::from_str(
            r#"{
                "name": "calendar",
                "version": "v3",
                "rootUrl": "https://ignored.example.com/",
                "servicePath": "other/",
                "baseUrl": "https://www.googleapis.com/calendar/v3/"
            }"#,
        )
        .unwrap();
        assert_eq!(
            doc.endpoints(),
            Some(ServiceEndpoints::new(
                "https://www.googleapis.com/calendar/v3/"
            ))
        );
        assert_eq!(doc.describe(), "calendar v3");
    }

    #[test]
    fn discovery_joins_root_and_service_path() {
        let doc: DiscoveryDocument = serde_json::from_str(
            r#"{"rootUrl": "https://www.googleapis.com/", "servicePath": "calendar/v3/"}"#,
        )
        .unwrap();
        assert_eq!(
            doc.endpoints().unwrap().base_url(),
            "https://www.googleapis.com/calendar/v3/"
        );
    }

    #[test]
    fn discovery_without_endpoint_fields_yields_none() {
        let doc: DiscoveryDocument =
            serde_json::from_str(r#"{"name": "calendar", "version": "v3"}"#).unwrap();
        assert_eq!(doc.endpoints(), None);
    }

    #[test]
    fn event_list_parses_with_missing_items() {
        let list: EventListResponse = serde_json::from_str(r#"{"kind": "calendar#events"}"#).unwrap();
        assert!(list.items.is_empty());
        assert_eq!(list.next_page_token, None);
    }

    #[test]
    fn event_list_parses_items_in_order() {
        let list: EventListResponse = serde_json::from_str(
            r#"{
                "items": [
                    {"id": "a", "summary": "first"},
                    {"id": "b", "summary": "second"}
                ],
                "nextPageToken": "tok"
            }"#,
        )
        .unwrap();
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].id.as_deref(), Some("a"));
        assert_eq!(list.items[1].id.as_deref(), Some("b"));
        assert_eq!(list.next_page_token.as_deref(), Some("tok"));
    }
}

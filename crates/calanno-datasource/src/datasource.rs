//! The calendar annotation datasource.
//!
//! [`CalendarDatasource`] is the surface a dashboard host calls:
//! connectivity test, explicit initialization, and annotation queries.
//! It owns a [`Session`] that initializes the underlying client at most
//! once, and it maps listed events into annotation records.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use calanno_core::{AnnotationEvent, AnnotationQuery};

use crate::annotations::annotations_for_events;
use crate::api::{CalendarApi, ClientConfig, EventsQuery};
use crate::error::DatasourceResult;
use crate::session::{InitPhase, Session};
use crate::settings::InstanceSettings;

/// Result of a connectivity test, in the shape hosts render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: String,
    pub message: String,
    pub title: String,
}

impl ConnectionStatus {
    /// The fixed payload reported for a working datasource.
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: "Data source is working".to_string(),
            title: "Success".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// A configured datasource instance bound to a calendar API client.
pub struct CalendarDatasource {
    source_type: String,
    name: String,
    config: ClientConfig,
    api: Arc<dyn CalendarApi>,
    session: Session,
}

impl CalendarDatasource {
    pub fn new(settings: &InstanceSettings, api: Arc<dyn CalendarApi>) -> Self {
        let config = settings.client_config();
        Self {
            source_type: settings.source_type.clone(),
            name: settings.name.clone(),
            session: Session::new(api.clone(), config.clone()),
            config,
            api,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn init_phase(&self) -> InitPhase {
        self.session.phase().await
    }

    pub async fn is_initialized(&self) -> bool {
        self.session.is_ready().await
    }

    /// Verifies the instance can reach and initialize the calendar API.
    ///
    /// Loads the client and initializes it against the configuration,
    /// nothing more: no sign-in and no session state change, so the test
    /// is safe to repeat. Failures carry the upstream detail.
    pub async fn test_datasource(&self) -> DatasourceResult<ConnectionStatus> {
        debug!("testing datasource {}", self.name);
        let result = self.run_connectivity_test().await;
        if let Err(err) = &result {
            warn!("connectivity test failed: {}", err);
        }
        result
    }

    async fn run_connectivity_test(&self) -> DatasourceResult<ConnectionStatus> {
        self.api.load().await?;
        self.api.init_client(self.config.clone()).await?;
        Ok(ConnectionStatus::success())
    }

    /// Initializes the session, including interactive sign-in when no
    /// session exists. No-op once initialized.
    pub async fn initialize(&self) -> DatasourceResult<()> {
        self.session.ensure_ready().await
    }

    /// Resolves an annotation query to its records.
    ///
    /// A query whose annotation names no calendar resolves to an empty
    /// record set without touching the API. Otherwise the session is
    /// initialized on demand and exactly one event listing runs.
    pub async fn annotation_query(
        &self,
        query: &AnnotationQuery,
    ) -> DatasourceResult<Vec<AnnotationEvent>> {
        let Some(calendar_id) = query.annotation.calendar_id() else {
            debug!("annotation names no calendar, returning no records");
            return Ok(Vec::new());
        };

        self.initialize().await?;

        let events = self
            .api
            .list_events(EventsQuery::annotations(calendar_id, query.range))
            .await?;
        let records = annotations_for_events(&query.annotation, &events);
        debug!(
            "mapped {} events into {} annotation records",
            events.len(),
            records.len()
        );
        Ok(records)
    }
}

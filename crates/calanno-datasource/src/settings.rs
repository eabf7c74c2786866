//! Datasource instance settings.
//!
//! Settings arrive as JSON in the shape the dashboard host hands to
//! datasource plugins: identity fields at the top level, plain options
//! under `jsonData`, and secrets under `secureJsonData`. The secret block
//! is skipped on serialization so settings can be echoed back without
//! leaking credentials.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::ClientConfig;
use crate::error::{DatasourceError, DatasourceResult};

/// One configured datasource instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSettings {
    /// Plugin type identifier, fixed per plugin build.
    #[serde(rename = "type")]
    pub source_type: String,
    /// User-chosen instance name.
    pub name: String,
    #[serde(default)]
    pub json_data: JsonData,
    #[serde(default, skip_serializing)]
    pub secure_json_data: Option<SecureJsonData>,
}

/// Non-secret per-instance options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonData {
    pub client_id: String,
}

/// Secret per-instance options. Never serialized back out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecureJsonData {
    pub client_secret: String,
}

impl InstanceSettings {
    pub fn new(source_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            name: name.into(),
            json_data: JsonData::default(),
            secure_json_data: None,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.json_data.client_id = client_id.into();
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.secure_json_data = Some(SecureJsonData {
            client_secret: client_secret.into(),
        });
        self
    }

    /// Parses settings from their JSON representation.
    pub fn from_json(json: &str) -> DatasourceResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DatasourceError::Config(format!("failed to parse settings: {e}")))
    }

    /// Reads settings from a file.
    pub fn load_from(path: &Path) -> DatasourceResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            DatasourceError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Client configuration derived from these settings.
    ///
    /// Scope and discovery documents are fixed by the plugin; only the
    /// client id comes from instance configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.json_data.client_id)
    }

    /// The configured OAuth client secret, if one is set and non-blank.
    pub fn client_secret(&self) -> Option<&str> {
        self.secure_json_data
            .as_ref()
            .map(|s| s.client_secret.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Checks that the settings can produce a working client
    /// configuration.
    pub fn validate(&self) -> DatasourceResult<()> {
        if self.name.trim().is_empty() {
            return Err(DatasourceError::Config(
                "instance name is required".to_string(),
            ));
        }
        self.client_config()
            .validate()
            .map_err(DatasourceError::Config)
    }
}

//! Settings file resolution and loading.
//!
//! The CLI reads the same JSON settings document a dashboard host would
//! hand to the datasource. The path comes from `--settings`, the
//! `CALANNO_SETTINGS` environment variable, or the default location
//! under the user's config directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use calanno_datasource::InstanceSettings;

use crate::error::{CliError, CliResult};

/// Default settings file location.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("calanno")
        .join("settings.json")
}

/// The settings path the CLI will use, given the `--settings` flag.
pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path.map(Path::to_path_buf).unwrap_or_else(default_path)
}

/// Loads instance settings from the resolved path.
pub fn load(cli_path: Option<&Path>) -> CliResult<InstanceSettings> {
    let path = resolve_path(cli_path);
    if !path.exists() {
        return Err(CliError::Settings(format!(
            "no settings file at {}; create one or pass --settings",
            path.display()
        )));
    }

    debug!("loading settings from {}", path.display());
    InstanceSettings::load_from(&path).map_err(|e| match e.details() {
        Some(details) => CliError::Settings(details.to_string()),
        None => CliError::Settings(e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SETTINGS_JSON: &str = r#"{
        "type": "google-calendar-annotations",
        "name": "team calendar",
        "jsonData": {"clientId": "id.apps.googleusercontent.com"}
    }"#;

    #[test]
    fn loads_settings_from_an_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, SETTINGS_JSON).unwrap();

        let settings = load(Some(&path)).unwrap();
        assert_eq!(settings.name, "team calendar");
        assert_eq!(settings.json_data.client_id, "id.apps.googleusercontent.com");
    }

    #[test]
    fn missing_file_names_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nope.json");

        let err = load(Some(&path)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope.json"));
        assert!(msg.contains("--settings"));
    }

    #[test]
    fn malformed_settings_surface_the_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{broken").unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, CliError::Settings(_)));
        assert!(err.to_string().contains("failed to parse settings"));
    }

    #[test]
    fn explicit_path_wins_over_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("custom.json");
        assert_eq!(resolve_path(Some(&path)), path);
        assert_eq!(resolve_path(None), default_path());
    }
}

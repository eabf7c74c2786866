//! CLI error types.

use std::fmt;

use calanno_datasource::DatasourceError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Settings file missing, unreadable, or invalid.
    Settings(String),
    /// A `--from`/`--to` value did not parse.
    InvalidTimeSpec(String),
    /// Output could not be encoded.
    Json(serde_json::Error),
    /// The datasource reported a failure.
    Datasource(DatasourceError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settings(msg) => write!(f, "settings error: {}", msg),
            Self::InvalidTimeSpec(spec) => write!(
                f,
                "invalid time spec {:?} (expected RFC 3339, YYYY-MM-DD, now, or now+/-<n>{{s,m,h,d,w}})",
                spec
            ),
            Self::Json(err) => write!(f, "failed to encode output: {}", err),
            Self::Datasource(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Datasource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DatasourceError> for CliError {
    fn from(err: DatasourceError) -> Self {
        Self::Datasource(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasource_errors_display_unwrapped() {
        let err = CliError::from(DatasourceError::SignIn);
        assert_eq!(err.to_string(), "failed to sign-in");
    }

    #[test]
    fn time_spec_errors_name_the_accepted_formats() {
        let err = CliError::InvalidTimeSpec("someday".to_string());
        let msg = err.to_string();
        assert!(msg.contains("someday"));
        assert!(msg.contains("RFC 3339"));
    }
}

//! Error types for datasource operations.
//!
//! Errors are grouped by the pipeline stage that produced them, so callers
//! can tell a client that never loaded apart from a query that failed
//! upstream. Variants carry owned detail strings and the whole type is
//! `Clone`, which lets an initialization failure be broadcast to every
//! caller waiting on the same attempt.

use thiserror::Error;

/// Convenience alias for datasource results.
pub type DatasourceResult<T> = Result<T, DatasourceError>;

/// Errors surfaced by datasource operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasourceError {
    /// The calendar API client could not be loaded.
    #[error("failed to load calendar API: {0}")]
    Load(String),

    /// The calendar API client loaded but could not be initialized.
    #[error("failed to init: {0}")]
    Init(String),

    /// Interactive sign-in did not produce a session.
    #[error("failed to sign-in")]
    SignIn,

    /// A stored session is missing, expired, or otherwise unusable.
    #[error("not signed in: {0}")]
    Auth(String),

    /// An event query reached the service but failed.
    #[error("calendar query failed: {0}")]
    Query(String),

    /// The datasource is misconfigured.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DatasourceError {
    /// Returns the upstream detail carried by this error, if any.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::SignIn => None,
            Self::Load(details)
            | Self::Init(details)
            | Self::Auth(details)
            | Self::Query(details)
            | Self::Config(details) => Some(details),
        }
    }

    /// True when the error means the user has to sign in again.
    pub fn needs_sign_in(&self) -> bool {
        matches!(self, Self::SignIn | Self::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            DatasourceError::Load("script blocked".to_string()).to_string(),
            "failed to load calendar API: script blocked"
        );
        assert_eq!(
            DatasourceError::Init("bad discovery doc".to_string()).to_string(),
            "failed to init: bad discovery doc"
        );
        assert_eq!(DatasourceError::SignIn.to_string(), "failed to sign-in");
    }

    #[test]
    fn details_accessor() {
        assert_eq!(DatasourceError::SignIn.details(), None);
        assert_eq!(
            DatasourceError::Query("HTTP 500".to_string()).details(),
            Some("HTTP 500")
        );
    }

    #[test]
    fn sign_in_classification() {
        assert!(DatasourceError::SignIn.needs_sign_in());
        assert!(DatasourceError::Auth("token expired".to_string()).needs_sign_in());
        assert!(!DatasourceError::Query("HTTP 500".to_string()).needs_sign_in());
    }
}

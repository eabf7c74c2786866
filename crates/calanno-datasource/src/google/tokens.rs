//! OAuth token persistence.
//!
//! Tokens live in a JSON file owned by the current user. The store keeps
//! an in-memory copy behind an `RwLock` so status checks never touch the
//! disk, and writes go through a temp file plus rename so a crash cannot
//! leave a half-written token file behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DatasourceError, DatasourceResult};

/// A stored OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    /// Refresh token, absent when the authorization server withheld one.
    pub refresh_token: Option<String>,
    /// When the access token stops being usable.
    pub expires_at: DateTime<Utc>,
    /// Space-separated scope string the tokens were granted for.
    pub scope: String,
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Expiry safety margin, so a token is treated as stale slightly
    /// before the server would reject it.
    const EXPIRY_BUFFER_SECS: i64 = 60;

    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scope: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: Self::expiry_from(now, expires_in_secs),
            scope: scope.into(),
            last_refresh: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// True when every scope in `required` was granted.
    pub fn covers_scope(&self, required: &str) -> bool {
        required
            .split_whitespace()
            .all(|r| self.scope.split_whitespace().any(|granted| granted == r))
    }

    fn refreshed(&self, access_token: &str, expires_in_secs: Option<i64>) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.to_string(),
            expires_at: Self::expiry_from(now, expires_in_secs),
            last_refresh: now,
            ..self.clone()
        }
    }

    fn expiry_from(now: DateTime<Utc>, expires_in_secs: Option<i64>) -> DateTime<Utc> {
        let lifetime = expires_in_secs
            .unwrap_or(3600)
            .saturating_sub(Self::EXPIRY_BUFFER_SECS);
        // expires_in is server-supplied; out-of-range values clamp.
        Duration::try_seconds(lifetime)
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(if lifetime < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}

/// File-backed token store with an in-memory cache.
pub struct TokenStore {
    path: PathBuf,
    cached: RwLock<Option<TokenInfo>>,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads tokens from disk into the cache. Returns `false` when no
    /// token file exists yet.
    pub fn load(&self) -> DatasourceResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            DatasourceError::Config(format!("failed to read token file: {e}"))
        })?;
        let info: TokenInfo = serde_json::from_str(&raw).map_err(|e| {
            DatasourceError::Config(format!("failed to parse token file: {e}"))
        })?;
        *self.cached.write().unwrap() = Some(info);
        debug!("loaded tokens from {}", self.path.display());
        Ok(true)
    }

    pub fn get(&self) -> Option<TokenInfo> {
        self.cached.read().unwrap().clone()
    }

    /// Stores a new token set and persists it.
    pub fn set(&self, info: TokenInfo) -> DatasourceResult<()> {
        self.save(&info)?;
        *self.cached.write().unwrap() = Some(info);
        Ok(())
    }

    /// Replaces the access token after a refresh, keeping the refresh
    /// token and scope.
    pub fn update_access_token(
        &self,
        access_token: &str,
        expires_in_secs: Option<i64>,
    ) -> DatasourceResult<()> {
        let current = self.get().ok_or_else(|| {
            DatasourceError::Auth("no stored tokens to refresh".to_string())
        })?;
        self.set(current.refreshed(access_token, expires_in_secs))
    }

    /// True when stored tokens cover the given scope string.
    pub fn covers_scope(&self, required: &str) -> bool {
        self.get().is_some_and(|info| info.covers_scope(required))
    }

    /// Drops the cached tokens and deletes the token file.
    pub fn clear(&self) -> DatasourceResult<()> {
        *self.cached.write().unwrap() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                DatasourceError::Config(format!("failed to remove token file: {e}"))
            })?;
            debug!("removed token file {}", self.path.display());
        }
        Ok(())
    }

    fn save(&self, info: &TokenInfo) -> DatasourceResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                DatasourceError::Config(format!("failed to create token directory: {e}"))
            })?;
        }

        let json = serde_json::to_string_pretty(info).map_err(|e| {
            DatasourceError::Config(format!("failed to serialize tokens: {e}"))
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &json).map_err(|e| {
            DatasourceError::Config(format!("failed to write token file: {e}"))
        })?;

        // Token files hold credentials; restrict them to the owner.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&temp_path, perms);
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            DatasourceError::Config(format!("failed to persist token file: {e}"))
        })?;
        debug!("saved tokens to {}", self.path.display());
        Ok(())
    }
}

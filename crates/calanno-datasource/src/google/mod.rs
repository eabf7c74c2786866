//! Google-backed [`CalendarApi`] implementation.
//!
//! [`GoogleApi`] composes three pieces: a lazily built HTTP client
//! ([`load`](CalendarApi::load)), service endpoints resolved from
//! discovery documents ([`init_client`](CalendarApi::init_client)), and
//! a [`TokenStore`] holding the OAuth session. Sign-in runs the loopback
//! PKCE flow from [`oauth`]; expired access tokens are refreshed
//! silently when a refresh token and client secret are available.

mod client;
mod oauth;
mod tokens;

pub use client::ServiceEndpoints;
pub use oauth::{OAuthFlow, PkceChallenge};
pub use tokens::{TokenInfo, TokenStore};

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{AuthStatus, BoxFuture, CalendarApi, ClientConfig, EventsQuery};
use crate::error::{DatasourceError, DatasourceResult};
use crate::events::CalendarEvent;
use crate::settings::InstanceSettings;

/// Construction-time options for [`GoogleApi`].
#[derive(Debug, Clone)]
pub struct GoogleApiOptions {
    /// Instance name, used to separate token files between instances.
    pub instance_name: String,
    /// OAuth client secret; required for interactive sign-in and token
    /// refresh.
    pub client_secret: Option<String>,
    /// Where tokens are persisted.
    pub token_path: PathBuf,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Loopback ports tried for the sign-in callback, inclusive.
    pub loopback_port_range: (u16, u16),
    pub user_agent: String,
}

impl GoogleApiOptions {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new(instance_name: impl Into<String>) -> Self {
        let instance_name = instance_name.into();
        Self {
            token_path: Self::default_token_path(&instance_name),
            instance_name,
            client_secret: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            loopback_port_range: (8080, 8090),
            user_agent: format!("calanno/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Options derived from instance settings: the instance name picks
    /// the token file and the secret comes from the secure block.
    pub fn from_settings(settings: &InstanceSettings) -> Self {
        let mut options = Self::new(&settings.name);
        if let Some(secret) = settings.client_secret() {
            options.client_secret = Some(secret.to_string());
        }
        options
    }

    pub fn default_token_path(instance_name: &str) -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calanno")
            .join(format!("google-tokens-{}.json", slug(instance_name)))
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, range: (u16, u16)) -> Self {
        self.loopback_port_range = range;
        self
    }
}

/// Filesystem-safe identifier derived from an instance name.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        "default".to_string()
    } else {
        out
    }
}

/// Endpoint and identity state established by `init_client`.
#[derive(Debug, Clone)]
struct ServiceSession {
    client_id: String,
    scope: String,
    endpoints: ServiceEndpoints,
}

/// Production [`CalendarApi`] talking to Google Calendar.
pub struct GoogleApi {
    options: GoogleApiOptions,
    tokens: TokenStore,
    http: RwLock<Option<reqwest::Client>>,
    service: RwLock<Option<ServiceSession>>,
}

impl GoogleApi {
    pub fn new(options: GoogleApiOptions) -> Self {
        let tokens = TokenStore::new(&options.token_path);
        if let Err(e) = tokens.load() {
            warn!("could not load stored tokens: {}", e);
        }
        Self {
            options,
            tokens,
            http: RwLock::new(None),
            service: RwLock::new(None),
        }
    }

    pub fn from_settings(settings: &InstanceSettings) -> Self {
        Self::new(GoogleApiOptions::from_settings(settings))
    }

    /// The token store backing this client.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn http_client(&self) -> DatasourceResult<reqwest::Client> {
        self.http
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| DatasourceError::Load("API client not loaded".to_string()))
    }

    fn service_session(&self) -> DatasourceResult<ServiceSession> {
        self.service
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| DatasourceError::Init("client not initialized".to_string()))
    }

    /// Returns a non-expired access token, refreshing the stored one if
    /// needed.
    async fn fresh_access_token(
        &self,
        http: &reqwest::Client,
        service: &ServiceSession,
    ) -> DatasourceResult<String> {
        let Some(info) = self.tokens.get() else {
            return Err(DatasourceError::Auth(
                "no stored session; sign-in required".to_string(),
            ));
        };
        if !info.is_expired() {
            return Ok(info.access_token);
        }
        let Some(refresh_token) = info.refresh_token else {
            return Err(DatasourceError::Auth(
                "session expired and no refresh token is stored".to_string(),
            ));
        };
        let Some(secret) = self.options.client_secret.as_deref() else {
            return Err(DatasourceError::Auth(
                "session expired and no client secret is configured for refresh".to_string(),
            ));
        };

        debug!("refreshing expired access token");
        let flow = OAuthFlow::new(http.clone(), service.client_id.clone(), secret);
        let (access_token, expires_in) = flow.refresh(&refresh_token).await?;
        self.tokens.update_access_token(&access_token, expires_in)?;
        Ok(access_token)
    }
}

impl CalendarApi for GoogleApi {
    fn load(&self) -> BoxFuture<'_, DatasourceResult<()>> {
        Box::pin(async move {
            if self.http.read().unwrap().is_some() {
                return Ok(());
            }
            debug!("building HTTP client");
            let client = reqwest::Client::builder()
                .timeout(self.options.timeout)
                .user_agent(self.options.user_agent.clone())
                .build()
                .map_err(|e| {
                    DatasourceError::Load(format!("failed to build HTTP client: {e}"))
                })?;
            *self.http.write().unwrap() = Some(client);
            Ok(())
        })
    }

    fn init_client(&self, config: ClientConfig) -> BoxFuture<'_, DatasourceResult<()>> {
        Box::pin(async move {
            config.validate().map_err(DatasourceError::Init)?;
            let http = self.http_client()?;

            let endpoints = client::discover_endpoints(&http, &config.discovery_docs).await?;
            debug!("calendar service base URL: {}", endpoints.base_url());

            *self.service.write().unwrap() = Some(ServiceSession {
                client_id: config.client_id,
                scope: config.scope,
                endpoints,
            });
            Ok(())
        })
    }

    fn auth_status(&self) -> BoxFuture<'_, DatasourceResult<AuthStatus>> {
        let usable = self.tokens.get().is_some_and(|info| {
            !info.is_expired()
                || (info.refresh_token.is_some() && self.options.client_secret.is_some())
        });
        let scope_ok = match &*self.service.read().unwrap() {
            Some(service) => self.tokens.covers_scope(&service.scope),
            None => true,
        };
        let status = if usable && scope_ok {
            AuthStatus::SignedIn
        } else {
            AuthStatus::SignedOut
        };
        Box::pin(async move { Ok(status) })
    }

    fn sign_in(&self) -> BoxFuture<'_, DatasourceResult<AuthStatus>> {
        Box::pin(async move {
            let secret = self.options.client_secret.clone().ok_or_else(|| {
                DatasourceError::Config(
                    "a client secret is required for interactive sign-in".to_string(),
                )
            })?;
            let http = self.http_client()?;
            let service = self.service_session()?;

            let flow = OAuthFlow::new(http, service.client_id.clone(), secret);
            match flow
                .authorize(&service.scope, self.options.loopback_port_range)
                .await
            {
                Ok(tokens) => {
                    self.tokens.set(tokens)?;
                    info!("sign-in complete for {}", self.options.instance_name);
                    Ok(AuthStatus::SignedIn)
                }
                Err(err) => {
                    warn!("interactive sign-in failed: {}", err);
                    Ok(AuthStatus::SignedOut)
                }
            }
        })
    }

    fn list_events(&self, query: EventsQuery) -> BoxFuture<'_, DatasourceResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            let http = self.http_client()?;
            let service = self.service_session()?;
            let access_token = self.fresh_access_token(&http, &service).await?;
            client::list_events(&http, &service.endpoints, &access_token, &query).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_token_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        env::temp_dir().join(format!(
            "calanno-google-test-{}-{}.json",
            std::process::id(),
            n
        ))
    }

    fn options() -> GoogleApiOptions {
        GoogleApiOptions::new("test instance").with_token_path(temp_token_path())
    }

    mod naming {
        use super::*;

        #[test]
        fn slugs_are_filesystem_safe() {
            assert_eq!(slug("Team Calendar"), "team-calendar");
            assert_eq!(slug("ops//prod"), "ops-prod");
            assert_eq!(slug("  "), "default");
            assert_eq!(slug(""), "default");
            assert_eq!(slug("plain"), "plain");
        }

        #[test]
        fn default_token_path_is_per_instance() {
            let a = GoogleApiOptions::default_token_path("Team Calendar");
            let b = GoogleApiOptions::default_token_path("other");
            assert_ne!(a, b);
            assert!(a.ends_with("calanno/google-tokens-team-calendar.json"));
        }

        #[test]
        fn options_from_settings_pick_up_the_secret() {
            let settings = InstanceSettings::new("google-calendar-annotations", "mine")
                .with_client_id("id.apps.googleusercontent.com")
                .with_client_secret("shh");
            let options = GoogleApiOptions::from_settings(&settings);
            assert_eq!(options.instance_name, "mine");
            assert_eq!(options.client_secret.as_deref(), Some("shh"));
        }
    }

    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn load_is_idempotent() {
            let api = GoogleApi::new(options());
            api.load().await.unwrap();
            api.load().await.unwrap();
            assert!(api.http_client().is_ok());
        }

        #[tokio::test]
        async fn calls_before_load_fail_with_load_errors() {
            let api = GoogleApi::new(options().with_client_secret("shh"));

            let err = api
                .init_client(ClientConfig::new("id.apps.googleusercontent.com"))
                .await
                .unwrap_err();
            assert!(matches!(err, DatasourceError::Load(_)));

            let err = api.sign_in().await.unwrap_err();
            assert!(matches!(err, DatasourceError::Load(_)));
        }

        #[tokio::test]
        async fn init_rejects_invalid_configuration() {
            let api = GoogleApi::new(options());
            api.load().await.unwrap();

            let err = api.init_client(ClientConfig::new("")).await.unwrap_err();
            assert!(err.to_string().starts_with("failed to init: "));
        }

        #[tokio::test]
        async fn listing_before_init_fails() {
            let api = GoogleApi::new(options());
            api.load().await.unwrap();

            let query = EventsQuery::annotations(
                "primary",
                calanno_core::TimeRange::from_duration(
                    chrono::Utc::now(),
                    chrono::Duration::hours(1),
                ),
            );
            let err = api.list_events(query).await.unwrap_err();
            assert!(matches!(err, DatasourceError::Init(_)));
        }

        #[tokio::test]
        async fn sign_in_without_a_secret_is_a_config_error() {
            let api = GoogleApi::new(options());
            api.load().await.unwrap();

            let err = api.sign_in().await.unwrap_err();
            assert!(matches!(err, DatasourceError::Config(_)));
            assert!(err.to_string().contains("client secret"));
        }
    }

    mod sessions {
        use super::*;

        #[tokio::test]
        async fn no_tokens_means_signed_out() {
            let api = GoogleApi::new(options());
            assert_eq!(api.auth_status().await.unwrap(), AuthStatus::SignedOut);
        }

        #[tokio::test]
        async fn stored_tokens_survive_a_new_client() {
            let path = temp_token_path();

            let store = TokenStore::new(&path);
            store
                .set(TokenInfo::new(
                    "access",
                    Some("refresh".to_string()),
                    Some(3600),
                    ClientConfig::DEFAULT_SCOPE,
                ))
                .unwrap();

            let api = GoogleApi::new(
                GoogleApiOptions::new("persisted").with_token_path(&path),
            );
            assert_eq!(api.auth_status().await.unwrap(), AuthStatus::SignedIn);

            api.tokens().clear().unwrap();
        }

        #[tokio::test]
        async fn expired_tokens_without_refresh_are_signed_out() {
            let path = temp_token_path();

            let store = TokenStore::new(&path);
            store
                .set(TokenInfo::new("access", None, Some(0), "scope"))
                .unwrap();

            let api = GoogleApi::new(
                GoogleApiOptions::new("expired").with_token_path(&path),
            );
            assert_eq!(api.auth_status().await.unwrap(), AuthStatus::SignedOut);

            api.tokens().clear().unwrap();
        }

        #[tokio::test]
        async fn expired_tokens_with_refresh_need_a_secret() {
            let path = temp_token_path();

            let store = TokenStore::new(&path);
            store
                .set(TokenInfo::new(
                    "access",
                    Some("refresh".to_string()),
                    Some(0),
                    "scope",
                ))
                .unwrap();

            let without_secret = GoogleApi::new(
                GoogleApiOptions::new("refreshable").with_token_path(&path),
            );
            assert_eq!(
                without_secret.auth_status().await.unwrap(),
                AuthStatus::SignedOut
            );

            let with_secret = GoogleApi::new(
                GoogleApiOptions::new("refreshable")
                    .with_token_path(&path)
                    .with_client_secret("shh"),
            );
            assert_eq!(
                with_secret.auth_status().await.unwrap(),
                AuthStatus::SignedIn
            );

            with_secret.tokens().clear().unwrap();
        }
    }
}

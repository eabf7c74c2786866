//! Interactive OAuth 2.0 sign-in.
//!
//! Implements the authorization-code flow with PKCE for a native app:
//! bind a loopback port, open the consent page in the user's browser,
//! catch the redirect on the loopback listener, then exchange the
//! authorization code for tokens. The listener is plain blocking I/O and
//! runs on the blocking pool; one request is all it ever serves.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{DatasourceError, DatasourceResult};

use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Verifier entropy in bytes; encodes to 43 base64url characters.
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long to wait for the browser redirect before giving up.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// PKCE material for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceChallenge {
    pub fn new() -> Self {
        let verifier = generate_code_verifier();
        let challenge = code_challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: generate_state(),
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_code_verifier() -> String {
    let bytes: [u8; CODE_VERIFIER_LENGTH] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn code_challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn generate_state() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Wire shape of Google's token endpoint responses.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Runs the authorization-code flow against Google's OAuth endpoints.
pub struct OAuthFlow {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

impl OAuthFlow {
    pub fn new(
        http: reqwest::Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http,
        }
    }

    /// Runs the full interactive flow and returns the granted tokens.
    pub async fn authorize(
        &self,
        scope: &str,
        port_range: (u16, u16),
    ) -> DatasourceResult<TokenInfo> {
        let pkce = PkceChallenge::new();
        let (listener, port) = bind_loopback(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{port}/callback");
        let auth_url = self.build_auth_url(&redirect_uri, scope, &pkce);

        info!("waiting for sign-in callback on port {}", port);
        if let Err(e) = open::that(&auth_url) {
            warn!("could not open a browser: {}", e);
            eprintln!("Open this URL in your browser to sign in:\n{auth_url}");
        }

        let (code, state) =
            tokio::task::spawn_blocking(move || wait_for_callback(listener, CALLBACK_TIMEOUT))
                .await
                .map_err(|e| DatasourceError::Auth(format!("callback listener failed: {e}")))??;

        if state != pkce.state {
            return Err(DatasourceError::Auth(
                "state mismatch in sign-in callback".to_string(),
            ));
        }

        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scope)
            .await
    }

    /// Trades a refresh token for a new access token. Returns the token
    /// and its lifetime in seconds.
    pub async fn refresh(&self, refresh_token: &str) -> DatasourceResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let token = self.token_request(&params, "token refresh").await?;
        Ok((token.access_token, token.expires_in))
    }

    fn build_auth_url(&self, redirect_uri: &str, scope: &str, pkce: &PkceChallenge) -> String {
        format!(
            "{GOOGLE_AUTH_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(scope),
            urlencoding::encode(&pkce.state),
            urlencoding::encode(&pkce.challenge),
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scope: &str,
    ) -> DatasourceResult<TokenInfo> {
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
            ("code_verifier", verifier),
        ];
        let token = self.token_request(&params, "token exchange").await?;
        Ok(TokenInfo::new(
            token.access_token,
            token.refresh_token,
            token.expires_in,
            token.scope.unwrap_or_else(|| scope.to_string()),
        ))
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> DatasourceResult<TokenResponse> {
        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| DatasourceError::Auth(format!("{what} request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DatasourceError::Auth(format!(
                "{what} failed ({status}): {body}"
            )));
        }
        serde_json::from_str(&body)
            .map_err(|e| DatasourceError::Auth(format!("invalid {what} response: {e}")))
    }
}

fn bind_loopback(port_range: (u16, u16)) -> DatasourceResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            return Ok((listener, port));
        }
    }
    Err(DatasourceError::Config(format!(
        "no free loopback port between {} and {} for the sign-in callback",
        port_range.0, port_range.1
    )))
}

/// Blocks until the browser redirect arrives or the timeout passes.
///
/// The accept loop runs on its own thread so a hung connection cannot
/// defeat the timeout; the thread exits after the first usable callback.
fn wait_for_callback(
    listener: TcpListener,
    timeout: Duration,
) -> DatasourceResult<(String, String)> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            if let Some(result) = handle_callback(stream) {
                let _ = tx.send(result);
                break;
            }
        }
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(DatasourceError::Auth(
            "timed out waiting for the sign-in callback".to_string(),
        )),
    }
}

/// Parses one HTTP request on the loopback listener.
///
/// Returns `None` for requests that are not the OAuth callback, such as
/// favicon probes, so the accept loop keeps waiting.
fn handle_callback(mut stream: TcpStream) -> Option<DatasourceResult<(String, String)>> {
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;

    let path = request_line.split_whitespace().nth(1)?;
    if !path.starts_with("/callback") {
        respond(&mut stream, "404 Not Found", "Not found.");
        return None;
    }

    let query = path.splitn(2, '?').nth(1).unwrap_or("");

    if let Some(error) = query_param(query, "error") {
        respond(
            &mut stream,
            "200 OK",
            "Sign-in was cancelled. You can close this tab.",
        );
        return Some(Err(DatasourceError::Auth(format!(
            "authorization denied: {error}"
        ))));
    }

    let code = query_param(query, "code");
    let state = query_param(query, "state");
    match (code, state) {
        (Some(code), Some(state)) => {
            respond(
                &mut stream,
                "200 OK",
                "Sign-in complete. You can close this tab.",
            );
            Some(Ok((code, state)))
        }
        _ => {
            respond(&mut stream, "400 Bad Request", "Malformed callback.");
            Some(Err(DatasourceError::Auth(
                "callback missing code or state".to_string(),
            )))
        }
    }
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        if parts.next()? != key {
            return None;
        }
        let value = parts.next().unwrap_or("");
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}

fn respond(stream: &mut TcpStream, status: &str, message: &str) {
    let body = format!("<html><body><h2>{message}</h2></body></html>");
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_is_43_base64url_chars() {
        let pkce = PkceChallenge::new();
        assert_eq!(pkce.verifier.len(), 43);
        assert!(
            pkce.verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn challenge_matches_rfc_7636_vector() {
        // Appendix B of RFC 7636.
        let challenge = code_challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn attempts_are_independent() {
        let a = PkceChallenge::new();
        let b = PkceChallenge::new();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
    }

    #[tokio::test]
    async fn auth_url_carries_the_pkce_parameters() {
        let flow = OAuthFlow::new(
            reqwest::Client::new(),
            "id.apps.googleusercontent.com",
            "secret",
        );
        let pkce = PkceChallenge::new();
        let url = flow.build_auth_url("http://127.0.0.1:8080/callback", "scope.a scope.b", &pkce);

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=id.apps.googleusercontent.com"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("code_challenge={}", pkce.challenge)));
        assert!(url.contains("scope=scope.a%20scope.b"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn query_params_decode() {
        let query = "code=4%2F0Af&state=xyz&scope=a%20b";
        assert_eq!(query_param(query, "code").as_deref(), Some("4/0Af"));
        assert_eq!(query_param(query, "state").as_deref(), Some("xyz"));
        assert_eq!(query_param(query, "missing"), None);
    }

    #[test]
    fn loopback_binds_within_the_range() {
        let (listener, port) = bind_loopback((18080, 18090)).unwrap();
        assert!((18080..=18090).contains(&port));
        assert_eq!(listener.local_addr().unwrap().port(), port);

        // The next attempt must skip the occupied port.
        let (_second, next) = bind_loopback((18080, 18090)).unwrap();
        assert_ne!(next, port);
        assert!((18080..=18090).contains(&next));
    }

    #[test]
    fn empty_range_yields_a_config_error() {
        let err = bind_loopback((1, 0)).unwrap_err();
        assert!(matches!(err, DatasourceError::Config(_)));
    }
}

//! Initialization session for a calendar API client.
//!
//! Initialization is a pipeline: load the client, initialize it against
//! the configuration, then check for an existing session and fall back to
//! interactive sign-in. [`Session`] runs that pipeline at most once at a
//! time. The first caller becomes the leader and drives the pipeline;
//! concurrent callers subscribe to a watch channel carrying the current
//! [`InitPhase`] and settle on the same outcome. A failed attempt resets
//! the session so a later call can retry from scratch.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::api::{AuthStatus, CalendarApi, ClientConfig};
use crate::error::{DatasourceError, DatasourceResult};

/// Where an initialization attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitPhase {
    /// No attempt has run, or the last attempt failed.
    Uninitialized,
    /// Loading the API client.
    ScriptLoading,
    /// Initializing the client against the configuration.
    ClientInit,
    /// Waiting for the interactive sign-in flow to settle.
    AwaitingSignIn,
    /// Initialization finished; queries can run.
    Ready,
    /// The attempt failed with this error.
    Failed(DatasourceError),
}

impl InitPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::ScriptLoading => "loading",
            Self::ClientInit => "initializing",
            Self::AwaitingSignIn => "awaiting sign-in",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl std::fmt::Display for InitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

enum SessionState {
    Idle,
    InFlight(watch::Receiver<InitPhase>),
    Ready,
}

/// Single-flight initialization driver around a [`CalendarApi`].
pub struct Session {
    api: Arc<dyn CalendarApi>,
    config: ClientConfig,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(api: Arc<dyn CalendarApi>, config: ClientConfig) -> Self {
        Self {
            api,
            config,
            state: Mutex::new(SessionState::Idle),
        }
    }

    /// The phase the session is in right now.
    pub async fn phase(&self) -> InitPhase {
        let state = self.state.lock().await;
        match &*state {
            SessionState::Idle => InitPhase::Uninitialized,
            SessionState::Ready => InitPhase::Ready,
            SessionState::InFlight(rx) => rx.borrow().clone(),
        }
    }

    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.lock().await, SessionState::Ready)
    }

    /// Returns once the session is initialized, driving the pipeline if
    /// nobody else is.
    ///
    /// Joining callers resolve with the leader's outcome. If the leader
    /// is cancelled mid-flight the watch channel closes without a
    /// terminal phase; waiters then reset the session and retry, so one
    /// dropped future cannot wedge every later call.
    pub async fn ensure_ready(&self) -> DatasourceResult<()> {
        loop {
            let mut rx = {
                let mut state = self.state.lock().await;
                match &*state {
                    SessionState::Ready => return Ok(()),
                    SessionState::InFlight(rx) => rx.clone(),
                    SessionState::Idle => {
                        let (tx, rx) = watch::channel(InitPhase::ScriptLoading);
                        *state = SessionState::InFlight(rx);
                        drop(state);
                        return self.lead(tx).await;
                    }
                }
            };

            loop {
                let phase = rx.borrow_and_update().clone();
                match phase {
                    InitPhase::Ready => return Ok(()),
                    InitPhase::Failed(err) => return Err(err),
                    _ => {}
                }
                if rx.changed().await.is_err() {
                    // Leader dropped without reaching a terminal phase.
                    let mut state = self.state.lock().await;
                    if let SessionState::InFlight(current) = &*state
                        && current.same_channel(&rx)
                    {
                        *state = SessionState::Idle;
                    }
                    break;
                }
            }
        }
    }

    async fn lead(&self, tx: watch::Sender<InitPhase>) -> DatasourceResult<()> {
        let result = self.run_pipeline(&tx).await;

        let mut state = self.state.lock().await;
        match &result {
            Ok(()) => {
                info!("calendar session initialized");
                *state = SessionState::Ready;
                let _ = tx.send(InitPhase::Ready);
            }
            Err(err) => {
                warn!("initialization failed: {}", err);
                *state = SessionState::Idle;
                let _ = tx.send(InitPhase::Failed(err.clone()));
            }
        }
        result
    }

    async fn run_pipeline(&self, tx: &watch::Sender<InitPhase>) -> DatasourceResult<()> {
        debug!("loading calendar API client");
        self.api.load().await?;

        let _ = tx.send(InitPhase::ClientInit);
        debug!("initializing calendar API client");
        self.api.init_client(self.config.clone()).await?;

        if self.api.auth_status().await? == AuthStatus::SignedIn {
            debug!("existing session found, skipping sign-in");
            return Ok(());
        }

        let _ = tx.send(InitPhase::AwaitingSignIn);
        info!("no active session, starting interactive sign-in");
        match self.api.sign_in().await? {
            AuthStatus::SignedIn => Ok(()),
            AuthStatus::SignedOut => Err(DatasourceError::SignIn),
        }
    }
}

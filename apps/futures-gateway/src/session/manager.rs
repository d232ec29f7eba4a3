//! Connection/authentication/login state machine.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::connector::{ConnectorCallback, ConnectorError, ExchangeConnector};
use crate::models::{Credentials, ExchangeError};

/// Session connection state.
///
/// The happy path is a strict sequence; `LoginFailed` is terminal for the
/// session instance. A disconnect returns to `Disconnected` but the
/// login-failure latch survives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No transport to the front.
    Disconnected,
    /// Transport being established.
    Connecting,
    /// Transport up, nothing authenticated yet.
    Connected,
    /// App-level authentication in flight.
    Authenticating,
    /// App-level authentication complete.
    Authenticated,
    /// Login request in flight.
    LoggingIn,
    /// Logged in; front/session identity captured.
    LoggedIn,
    /// Settlement confirmed; trading and queries permitted.
    SettlementConfirmed,
    /// Login or authentication failed; latched, never retried here.
    LoginFailed,
}

impl SessionState {
    /// Whether trading and query operations are permitted.
    #[must_use]
    pub const fn is_trading_ready(&self) -> bool {
        matches!(self, Self::SettlementConfirmed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Authenticating => "AUTHENTICATING",
            Self::Authenticated => "AUTHENTICATED",
            Self::LoggingIn => "LOGGING_IN",
            Self::LoggedIn => "LOGGED_IN",
            Self::SettlementConfirmed => "SETTLEMENT_CONFIRMED",
            Self::LoginFailed => "LOGIN_FAILED",
        };
        write!(f, "{name}")
    }
}

/// Read-only view of the session's connection state.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    /// Current state.
    pub state: SessionState,
    /// Front ID captured at login, 0 before login.
    pub front_id: i32,
    /// Session ID captured at login, 0 before login.
    pub session_id: i64,
    /// The latched login/authentication error, if any.
    pub login_error: Option<ExchangeError>,
}

/// Owns the connect → authenticate → login → settlement sequence for one
/// logical exchange connection.
///
/// Mutated only from the session's dispatch task (and the thin idempotent
/// `connect` entry point); consumers read state through [`SessionStatus`]
/// snapshots.
pub struct SessionManager {
    connector: Arc<dyn ExchangeConnector>,
    credentials: Credentials,
    request_seq: Arc<AtomicU64>,
    state: SessionState,
    login_failed: bool,
    login_error: Option<ExchangeError>,
    front_id: i32,
    session_id: i64,
}

impl SessionManager {
    /// Create a manager in the `Disconnected` state.
    pub fn new(
        connector: Arc<dyn ExchangeConnector>,
        credentials: Credentials,
        request_seq: Arc<AtomicU64>,
    ) -> Self {
        Self {
            connector,
            credentials,
            request_seq,
            state: SessionState::Disconnected,
            login_failed: false,
            login_error: None,
            front_id: 0,
            session_id: 0,
        }
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            front_id: self.front_id,
            session_id: self.session_id,
            login_error: self.login_error.clone(),
        }
    }

    /// Identity captured at login: (front_id, session_id).
    #[must_use]
    pub const fn identity(&self) -> (i32, i64) {
        (self.front_id, self.session_id)
    }

    /// Open the connection, or nudge a connected-but-idle session back into
    /// the login sequence. Idempotent: calling while connecting, logging
    /// in, logged in or latched is a no-op.
    pub async fn connect(&mut self) -> Result<(), ConnectorError> {
        match self.state {
            SessionState::Disconnected => {
                self.request_seq.fetch_add(1, Ordering::SeqCst);
                self.connector.connect().await?;
                self.state = SessionState::Connecting;
                tracing::info!("connecting to trading front");
                Ok(())
            }
            SessionState::Connected | SessionState::Authenticated => self.request_login().await,
            _ => Ok(()),
        }
    }

    /// Apply one connector callback, driving the login sequence forward.
    ///
    /// Follow-up request failures are logged, not propagated; the consumer
    /// observes the stalled state through its own timeout budget.
    pub async fn handle(&mut self, callback: &ConnectorCallback) {
        match callback {
            ConnectorCallback::Connected => {
                self.state = SessionState::Connected;
                tracing::info!("trading front connected");
                if self.credentials.requires_authentication() {
                    self.request_authenticate().await;
                } else if let Err(error) = self.request_login().await {
                    tracing::error!(%error, "login request failed");
                }
            }
            ConnectorCallback::Disconnected => {
                // The latch survives a disconnect.
                self.state = SessionState::Disconnected;
                tracing::info!("trading front disconnected");
            }
            ConnectorCallback::Authenticated(Ok(())) => {
                self.state = SessionState::Authenticated;
                tracing::info!("trading front authenticated");
                if let Err(error) = self.request_login().await {
                    tracing::error!(%error, "login request failed");
                }
            }
            ConnectorCallback::Authenticated(Err(error)) => {
                tracing::error!(code = error.code, message = %error.message, "authentication failed");
                self.latch_failure(error.clone());
            }
            ConnectorCallback::LoggedIn(Ok(grant)) => {
                self.front_id = grant.front_id;
                self.session_id = grant.session_id;
                self.state = SessionState::LoggedIn;
                tracing::info!(
                    front_id = grant.front_id,
                    session_id = grant.session_id,
                    "trading front login completed"
                );
                self.request_seq.fetch_add(1, Ordering::SeqCst);
                if let Err(error) = self.connector.confirm_settlement(&self.credentials).await {
                    tracing::error!(%error, "settlement confirmation request failed");
                }
            }
            ConnectorCallback::LoggedIn(Err(error)) => {
                tracing::error!(code = error.code, message = %error.message, "login failed");
                self.latch_failure(error.clone());
            }
            ConnectorCallback::SettlementConfirmed => {
                self.state = SessionState::SettlementConfirmed;
                tracing::info!("settlement info confirmed");
                self.request_seq.fetch_add(1, Ordering::SeqCst);
                if let Err(error) = self.connector.query_instruments().await {
                    tracing::error!(%error, "instrument refresh request failed");
                }
            }
            _ => {}
        }
    }

    async fn request_authenticate(&mut self) {
        if self.login_failed {
            tracing::warn!("authentication suppressed by failure latch");
            return;
        }
        self.state = SessionState::Authenticating;
        self.request_seq.fetch_add(1, Ordering::SeqCst);
        if let Err(error) = self.connector.authenticate(&self.credentials).await {
            tracing::error!(%error, "authentication request failed");
        }
    }

    async fn request_login(&mut self) -> Result<(), ConnectorError> {
        // A latched failure must never turn into a retry storm.
        if self.login_failed {
            tracing::warn!("login suppressed by failure latch");
            return Ok(());
        }
        self.state = SessionState::LoggingIn;
        self.request_seq.fetch_add(1, Ordering::SeqCst);
        self.connector.login(&self.credentials).await
    }

    fn latch_failure(&mut self, error: ExchangeError) {
        self.login_error = Some(error);
        self.login_failed = true;
        self.state = SessionState::LoginFailed;
    }
}

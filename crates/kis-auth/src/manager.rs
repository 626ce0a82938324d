//! Credential manager: token state, exchange serialization, task ownership
//!
//! Two guards protect the token:
//! - `exchange_lock` (tokio Mutex) is held across the whole network exchange,
//!   so exchanges never interleave.
//! - `state` (std RwLock) holds the current token quadruple and is written
//!   once per successful exchange by swapping in a complete value. Readers
//!   take it briefly and never wait on the network.
//!
//! A failed exchange returns before touching `state`, so the previous token
//! stays valid until it actually expires.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::Secret;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::constants::{
    DEFAULT_MIN_REFRESH_INTERVAL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BACKOFF,
    MAX_EXPIRES_IN_MINUTES, MIN_SCHEDULE_DELAY, REFRESH_MARGIN,
};
use crate::error::{Error, Result};
use crate::refresh::{self, RefreshEvent};
use crate::token::{HttpTokenSource, TokenSource};

/// Tuning for the credential manager.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Deadline applied to every token exchange.
    pub request_timeout: Duration,
    /// Lower bound on the refresh loop's sleep.
    pub min_refresh_interval: Duration,
    /// First retry delay after a failed background refresh.
    pub retry_backoff: Duration,
}

impl AuthConfig {
    /// Raise scheduling delays to `MIN_SCHEDULE_DELAY` so a zero value
    /// cannot spin the refresh loop.
    fn with_schedule_floor(mut self) -> Self {
        self.min_refresh_interval = self.min_refresh_interval.max(MIN_SCHEDULE_DELAY);
        self.retry_backoff = self.retry_backoff.max(MIN_SCHEDULE_DELAY);
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Snapshot of the token acquired by the most recent successful exchange.
#[derive(Debug, Clone)]
pub struct TokenState {
    pub access_token: String,
    pub token_type: String,
    /// Validity in minutes as reported by the server.
    pub expires_in: i64,
    /// Wall-clock expiry, `now + expires_in` at exchange time.
    pub expires_at: DateTime<Utc>,
    /// Monotonic twin of `expires_at`, used for scheduling.
    pub(crate) deadline: Instant,
}

impl TokenState {
    /// Whether the token is within the refresh margin of expiry.
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN >= self.deadline
    }

    /// Time until the token enters the refresh margin; zero once inside it.
    pub(crate) fn until_refresh(&self) -> Duration {
        self.deadline
            .saturating_duration_since(Instant::now())
            .saturating_sub(REFRESH_MARGIN)
    }
}

/// State shared between the manager handle and its refresh task.
pub(crate) struct Shared {
    source: Box<dyn TokenSource>,
    exchange_lock: tokio::sync::Mutex<()>,
    state: RwLock<TokenState>,
    events: broadcast::Sender<RefreshEvent>,
    pub(crate) config: AuthConfig,
}

impl Shared {
    /// Run one token exchange and install the result.
    pub(crate) async fn exchange(&self) -> Result<TokenState> {
        let _guard = self.exchange_lock.lock().await;

        let response = match self.source.fetch().await {
            Ok(r) => r,
            Err(e) => {
                metrics::counter!("kis_token_exchanges_total", "outcome" => "failure")
                    .increment(1);
                return Err(e);
            }
        };
        if response.access_token.is_empty() {
            metrics::counter!("kis_token_exchanges_total", "outcome" => "failure").increment(1);
            return Err(Error::Decode("token response has empty AccessToken".into()));
        }

        let state = new_state(
            response.access_token,
            response.token_type,
            response.expires_in,
        );
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state.clone();

        metrics::counter!("kis_token_exchanges_total", "outcome" => "success").increment(1);
        Ok(state)
    }

    pub(crate) fn snapshot(&self) -> TokenState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn publish(&self, event: RefreshEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn new_state(access_token: String, token_type: String, expires_in: i64) -> TokenState {
    if expires_in > MAX_EXPIRES_IN_MINUTES {
        warn!(
            expires_in_minutes = expires_in,
            cap_minutes = MAX_EXPIRES_IN_MINUTES,
            "token lifetime exceeds cap, capping"
        );
    }
    let expires_in = expires_in.min(MAX_EXPIRES_IN_MINUTES);
    let minutes = expires_in.max(0);
    TokenState {
        access_token,
        token_type,
        expires_in,
        expires_at: Utc::now() + chrono::Duration::minutes(minutes),
        deadline: Instant::now() + Duration::from_secs(minutes.unsigned_abs() * 60),
    }
}

/// Owns the KIS bearer token for the lifetime of a client.
///
/// Construct with [`CredentialManager::connect`]; share via `Arc`. Dropping
/// the last handle cancels the background refresh task.
pub struct CredentialManager {
    endpoint: String,
    public_key: String,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CredentialManager {
    /// Exchange the key pair against `endpoint` and start background refresh.
    ///
    /// Fails with `Error::Authentication` if the first exchange fails; no
    /// manager with an unusable token is ever returned. Must be called from
    /// within a tokio runtime.
    pub async fn connect(
        public_key: impl Into<String>,
        secret_key: impl Into<Secret<String>>,
        endpoint: impl Into<String>,
        config: AuthConfig,
    ) -> Result<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();
        let public_key = public_key.into();
        let source = HttpTokenSource::new(
            &endpoint,
            public_key.clone(),
            secret_key.into(),
            config.request_timeout,
        )
        .map_err(|e| Error::Authentication(Box::new(e)))?;
        Self::with_source(endpoint, public_key, Box::new(source), config).await
    }

    /// Like `connect`, but with a caller-supplied token source.
    pub async fn with_source(
        endpoint: impl Into<String>,
        public_key: impl Into<String>,
        source: Box<dyn TokenSource>,
        config: AuthConfig,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let config = config.with_schedule_floor();
        let (events, _) = broadcast::channel(16);

        // Placeholder state is never observable: it is replaced by the first
        // exchange below, and the manager is not returned if that fails.
        let shared = Arc::new(Shared {
            source,
            exchange_lock: tokio::sync::Mutex::new(()),
            state: RwLock::new(new_state(String::new(), String::new(), 0)),
            events,
            config,
        });

        let state = shared.exchange().await.map_err(|e| {
            warn!(endpoint = %endpoint, error = %e, "initial token exchange failed");
            Error::Authentication(Box::new(e))
        })?;
        info!(
            endpoint = %endpoint,
            expires_in_minutes = state.expires_in,
            expires_at = %state.expires_at,
            "access token acquired"
        );

        let cancel = CancellationToken::new();
        let task = refresh::spawn_refresh_task(shared.clone(), cancel.clone());

        Ok(Self {
            endpoint,
            public_key: public_key.into(),
            shared,
            cancel,
            task: Mutex::new(Some(task)),
        })
    }

    /// Current bearer token. Never blocks on network I/O.
    ///
    /// The token may expire moments after this returns; the refresh margin
    /// narrows that window but does not close it.
    pub fn token(&self) -> String {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    pub fn token_type(&self) -> String {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token_type
            .clone()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .expires_at
    }

    /// Full snapshot of the current token quadruple.
    pub fn state(&self) -> TokenState {
        self.shared.snapshot()
    }

    /// API base URL, without trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Receive refresh outcomes from the background task.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.shared.events.subscribe()
    }

    /// Force an exchange now, outside the refresh schedule.
    ///
    /// Serialized with the background task; on failure the previous token
    /// is kept.
    pub async fn refresh_now(&self) -> Result<()> {
        let state = self.shared.exchange().await?;
        info!(expires_at = %state.expires_at, "access token refreshed on demand");
        Ok(())
    }

    /// Whether the background refresh task is still running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Cancel the refresh task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            match tokio::time::timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(())) => info!("token refresh stopped"),
                Ok(Err(e)) => warn!(error = %e, "token refresh task panicked"),
                Err(_) => warn!("token refresh task did not stop within 5s"),
            }
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("endpoint", &self.endpoint)
            .field("public_key", &self.public_key)
            .field("expires_at", &self.expires_at())
            .finish_non_exhaustive()
    }
}

impl Drop for CredentialManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

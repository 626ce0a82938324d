//! Resource client: authenticated GETs and envelope decoding
//!
//! Every resource endpoint answers `{Status, Resource, Payload}`. Errors go
//! through the same structured-body path as the token exchange
//! (`kis_auth::check_status`), so callers see one `Error::Api` shape for
//! every endpoint, including the 429 `Retry-After` hint.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use kis_auth::response::{decode_json, transport_error};
use kis_auth::{AuthConfig, CredentialManager, Error, RefreshEvent, Result, check_status};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::lookup::Query;

/// Tuning for the resource client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline applied to every resource request.
    pub request_timeout: Duration,
    /// Credential manager settings, used by `KisClient::connect`.
    pub auth: AuthConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: kis_auth::DEFAULT_REQUEST_TIMEOUT,
            auth: AuthConfig::default(),
        }
    }
}

/// Response envelope shared by all resource endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub resource: String,
    pub payload: T,
}

/// Client for the KIS telemetry API.
///
/// Cheap to clone; clones share the credential manager and connection pool.
#[derive(Clone)]
pub struct KisClient {
    auth: Arc<CredentialManager>,
    http: reqwest::Client,
}

impl KisClient {
    /// Authenticate against `endpoint` and build a client.
    ///
    /// Fails with `Error::Authentication` if the key pair is rejected or the
    /// endpoint is unreachable.
    pub async fn connect(
        public_key: impl Into<String>,
        secret_key: impl Into<Secret<String>>,
        endpoint: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let auth =
            CredentialManager::connect(public_key, secret_key, endpoint, config.auth.clone())
                .await?;
        Self::new(Arc::new(auth), config)
    }

    /// Build a client around an existing credential manager.
    pub fn new(auth: Arc<CredentialManager>, config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self { auth, http })
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.auth
    }

    pub fn endpoint(&self) -> &str {
        self.auth.endpoint()
    }

    /// Receive background token refresh outcomes.
    pub fn refresh_events(&self) -> broadcast::Receiver<RefreshEvent> {
        self.auth.subscribe()
    }

    /// Stop the background token refresh.
    pub async fn shutdown(&self) {
        self.auth.shutdown().await;
    }

    /// GET `{endpoint}/api/v1/{resource}` and return the envelope payload.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        query: Query,
    ) -> Result<T> {
        let url = format!("{}/api/v1/{resource}", self.auth.endpoint());
        debug!(resource, params = query.pairs().len(), "kis request");

        let result: Result<Envelope<T>> = self.send(&url, resource, &query).await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("kis_requests_total", "resource" => resource, "outcome" => outcome)
            .increment(1);

        let envelope = result.inspect_err(|e| {
            if let Error::Api(api) = e {
                if api.is_unauthorized() {
                    warn!(resource, status = api.status, "request rejected with current token");
                }
            }
        })?;
        debug!(
            resource,
            status = envelope.status,
            returned = %envelope.resource,
            "kis response decoded"
        );
        Ok(envelope.payload)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        resource: &'static str,
        query: &Query,
    ) -> Result<Envelope<T>> {
        let response = self
            .http
            .get(url)
            .query(query.pairs())
            .bearer_auth(self.auth.token())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(resource, e))?;

        let response = check_status(response).await?;
        decode_json(response, resource).await
    }
}

impl std::fmt::Debug for KisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KisClient")
            .field("endpoint", &self.auth.endpoint())
            .finish_non_exhaustive()
    }
}

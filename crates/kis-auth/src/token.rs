//! Token exchange against the KIS authorization endpoint
//!
//! POSTs the key pair form-encoded to `{endpoint}/api/v1/authorization/token`
//! and decodes `{AccessToken, TokenType, ExpiresIn}`. `ExpiresIn` is in
//! minutes, not seconds.
//!
//! `TokenSource` is the seam between the credential manager and the network:
//! the manager only knows how to ask for a fresh token, which keeps the
//! refresh schedule testable without a live server.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{GRANT_TYPE, TOKEN_PATH};
use crate::error::{Error, Result};
use crate::response::{check_status, decode_json, transport_error};

/// Success body from the token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Minutes until the access token expires (delta, not absolute)
    pub expires_in: i64,
}

/// Something that can trade credentials for a fresh token.
///
/// Uses `Pin<Box<dyn Future>>` so the manager can hold `Box<dyn TokenSource>`.
pub trait TokenSource: Send + Sync {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<TokenResponse>> + Send + '_>>;
}

/// Token source backed by the real HTTP endpoint.
pub struct HttpTokenSource {
    client: reqwest::Client,
    token_url: String,
    public_key: String,
    secret_key: Secret<String>,
}

impl HttpTokenSource {
    /// Build a source for `endpoint` with an explicit per-request deadline.
    pub fn new(
        endpoint: &str,
        public_key: impl Into<String>,
        secret_key: Secret<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("building token client: {e}")))?;
        Ok(Self::with_client(client, endpoint, public_key, secret_key))
    }

    /// Build a source that reuses an existing client.
    pub fn with_client(
        client: reqwest::Client,
        endpoint: &str,
        public_key: impl Into<String>,
        secret_key: Secret<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url(endpoint),
            public_key: public_key.into(),
            secret_key,
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

impl TokenSource for HttpTokenSource {
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<TokenResponse>> + Send + '_>> {
        Box::pin(exchange(
            &self.client,
            &self.token_url,
            &self.public_key,
            &self.secret_key,
        ))
    }
}

/// Token endpoint URL for an API base URL.
pub fn token_url(endpoint: &str) -> String {
    format!("{}{}", endpoint.trim_end_matches('/'), TOKEN_PATH)
}

/// Exchange the key pair for a token.
pub async fn exchange(
    client: &reqwest::Client,
    token_url: &str,
    public_key: &str,
    secret_key: &Secret<String>,
) -> Result<TokenResponse> {
    debug!(url = token_url, "requesting access token");

    let response = client
        .post(token_url)
        .form(&[
            ("grantType", GRANT_TYPE),
            ("publicKey", public_key),
            ("secretKey", secret_key.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| transport_error("token", e))?;

    let response = check_status(response).await?;
    decode_json(response, "token").await
}

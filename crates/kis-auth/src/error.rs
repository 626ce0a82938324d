//! Error types shared by the credential manager and the resource client

use std::fmt;
use std::time::Duration;

use crate::constants::RETRY_AFTER_HEADER;

/// Errors from token exchange and authenticated API calls.
///
/// Every variant carries owned strings so the type is `Clone` and can be
/// published to refresh-event subscribers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Request construction, connection failure, or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response with a structured error body.
    #[error("API error: {0}")]
    Api(ApiError),

    /// Response body did not match the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The initial token exchange failed; no client was constructed.
    #[error("authentication failed: {0}")]
    Authentication(Box<Error>),
}

impl Error {
    /// HTTP status of an `Api` error, looking through `Authentication`.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.status),
            Error::Authentication(inner) => inner.status(),
            _ => None,
        }
    }
}

/// Structured error returned by the KIS API on any non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code of the response.
    pub status: u16,
    pub title: String,
    pub error_type: String,
    /// Server-side correlation id, useful when reporting issues upstream.
    pub log_id: String,
    /// Free-form details. On HTTP 429 the last entry is `Retry-After: {value}`
    /// when the server sent that header.
    pub details: Vec<String>,
}

impl ApiError {
    /// Server's retry hint, if the details carry a `Retry-After` entry in
    /// delta-seconds form.
    pub fn retry_after(&self) -> Option<Duration> {
        let prefix = format!("{RETRY_AFTER_HEADER}: ");
        self.details.iter().find_map(|d| {
            d.strip_prefix(&prefix)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        })
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} with status {}, type {}, details: {}",
            self.title,
            self.status,
            self.error_type,
            self.details.join(", ")
        )
    }
}

/// Result alias for KIS operations.
pub type Result<T> = std::result::Result<T, Error>;

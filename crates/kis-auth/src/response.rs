//! Response status handling shared by every KIS endpoint
//!
//! The API reports failures with a JSON body `{Type, Title, Status, LogId,
//! Details}`. Both the token exchange and the resource lookups go through
//! `check_status`, so a 429 carries its `Retry-After` hint regardless of
//! which endpoint produced it.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::constants::RETRY_AFTER_HEADER;
use crate::error::{ApiError, Error, Result};

/// Error body as sent by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default, rename = "Type")]
    error_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    log_id: String,
    #[serde(default)]
    details: Option<Vec<String>>,
}

/// Pass successful responses through; turn anything else into `Error::Api`.
///
/// A non-JSON error body is reported as `Error::Decode` naming the status.
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Transport(format!("reading error body ({status}): {e}")))?;

    let body: ErrorBody = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Decode(format!("error response with status {status}: {e}")))?;

    let mut details = body.details.unwrap_or_default();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        if let Some(value) = retry_after.filter(|v| !v.is_empty()) {
            details.push(format!("{RETRY_AFTER_HEADER}: {value}"));
        }
    }

    debug!(status = status.as_u16(), title = %body.title, log_id = %body.log_id, "api error response");

    Err(Error::Api(ApiError {
        status: status.as_u16(),
        title: body.title,
        error_type: body.error_type,
        log_id: body.log_id,
        details,
    }))
}

/// Read the full body and decode it as JSON.
///
/// Split from `reqwest::Response::json` so that a broken connection is a
/// `Transport` error and a shape mismatch is a `Decode` error.
pub async fn decode_json<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Transport(format!("reading {what} response: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Decode(format!("invalid {what} response: {e}")))
}

/// Map a reqwest send error, keeping timeouts recognisable in the message.
pub fn transport_error(what: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Transport(format!("{what} request timed out: {err}"))
    } else {
        Error::Transport(format!("{what} request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn respond(template: ResponseTemplate) -> Result<reqwest::Response> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(template)
            .mount(&server)
            .await;
        let response = reqwest::get(server.uri()).await.unwrap();
        check_status(response).await
    }

    #[tokio::test]
    async fn success_passes_through() {
        let response = respond(ResponseTemplate::new(200).set_body_string("{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn structured_error_body_is_decoded() {
        let body = serde_json::json!({
            "Type": "validation",
            "Title": "Bad Request",
            "Status": 400,
            "LogId": "abc-123",
            "Details": ["machineUUID is required"]
        });
        let err = respond(ResponseTemplate::new(400).set_body_json(body))
            .await
            .unwrap_err();
        let Error::Api(api) = err else {
            panic!("expected Api error, got {err:?}");
        };
        assert_eq!(api.status, 400);
        assert_eq!(api.title, "Bad Request");
        assert_eq!(api.error_type, "validation");
        assert_eq!(api.log_id, "abc-123");
        assert_eq!(api.details, vec!["machineUUID is required"]);
    }

    #[tokio::test]
    async fn rate_limit_appends_retry_after() {
        let body = serde_json::json!({
            "Type": "throttle",
            "Title": "Too Many Requests",
            "Status": 429,
            "LogId": "l",
            "Details": ["slow down"]
        });
        let err = respond(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "30")
                .set_body_json(body),
        )
        .await
        .unwrap_err();
        let Error::Api(api) = err else {
            panic!("expected Api error, got {err:?}");
        };
        assert!(api.details.contains(&"Retry-After: 30".to_string()));
        assert_eq!(api.retry_after(), Some(std::time::Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn retry_after_ignored_on_other_statuses() {
        let body = serde_json::json!({"Title": "Unavailable", "Details": null});
        let err = respond(
            ResponseTemplate::new(503)
                .insert_header("Retry-After", "10")
                .set_body_json(body),
        )
        .await
        .unwrap_err();
        let Error::Api(api) = err else {
            panic!("expected Api error, got {err:?}");
        };
        assert!(api.details.is_empty());
    }

    #[tokio::test]
    async fn non_json_error_body_is_decode_error() {
        let err = respond(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(ref m) if m.contains("502")), "got {err:?}");
    }
}

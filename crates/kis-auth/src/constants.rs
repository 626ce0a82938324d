//! KIS authorization constants
//!
//! Wire-level values for the token endpoint plus the scheduling defaults used
//! by the refresh loop. The grant type is fixed by the API; the key pair
//! itself is supplied by the caller.

use std::time::Duration;

/// Token endpoint path, appended to the configured API endpoint.
pub const TOKEN_PATH: &str = "/api/v1/authorization/token";

/// The only grant type the KIS token endpoint accepts.
pub const GRANT_TYPE: &str = "authorization_code";

/// Refresh margin: a token within this window of expiry is refreshed.
/// Also subtracted from `ExpiresIn` when computing the next wake-up.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Default per-request deadline for every outbound call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lower bound on the refresh loop's sleep. Applies when the server reports
/// `ExpiresIn <= 1` and the margin would otherwise leave nothing to wait for.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// First retry delay after a failed background refresh. Doubles on each
/// consecutive failure, capped at the normal refresh interval.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Name of the header carrying the server's rate-limit hint on HTTP 429.
pub const RETRY_AFTER_HEADER: &str = "Retry-After";

/// Smallest sleep or retry delay the refresh loop accepts. Configured
/// values below this are raised to it.
pub const MIN_SCHEDULE_DELAY: Duration = Duration::from_secs(1);

/// Longest token lifetime honoured, in minutes (one year). Larger
/// `ExpiresIn` values are capped.
pub const MAX_EXPIRES_IN_MINUTES: i64 = 365 * 24 * 60;

//! Credential lifecycle for the KIS telemetry API
//!
//! Trades a public/secret key pair for a short-lived bearer token and keeps
//! that token fresh for as long as the owning client lives.
//!
//! Credential flow:
//! 1. `CredentialManager::connect()` performs the first token exchange and
//!    fails with `Error::Authentication` if the server rejects it
//! 2. A background task sleeps until one minute before expiry, then
//!    re-exchanges the same key pair
//! 3. Callers read the current token with `CredentialManager::token()`,
//!    which never waits on the network
//! 4. Refresh outcomes are published as `RefreshEvent`s; failures keep the
//!    previous token and retry with backoff
//! 5. `CredentialManager::shutdown()` (or dropping the manager) cancels the
//!    background task

pub mod constants;
pub mod error;
pub mod manager;
pub mod refresh;
pub mod response;
pub mod token;

pub use constants::*;
pub use error::{ApiError, Error, Result};
pub use manager::{AuthConfig, CredentialManager, TokenState};
pub use refresh::{RefreshEvent, refresh_interval};
pub use response::check_status;
pub use token::{HttpTokenSource, TokenResponse, TokenSource};

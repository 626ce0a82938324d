//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The secret key is loaded from KIS_SECRET_KEY or `secret_key_file`, never
//! stored in the TOML directly to avoid leaking it. The public key may live
//! in the file and is overridden by KIS_PUBLIC_KEY.

use common::Secret;
use kis_client::{AuthConfig, ClientConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub lookup: LookupConfig,
}

/// KIS endpoint and credentials
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(skip)]
    pub secret_key: Option<Secret<String>>,
    /// Path to a file containing the secret key (alternative to KIS_SECRET_KEY)
    #[serde(default)]
    pub secret_key_file: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_min_refresh")]
    pub min_refresh_secs: u64,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
}

/// What the CLI looks up
#[derive(Debug, Deserialize)]
pub struct LookupConfig {
    pub machine_uuid: String,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default = "default_history_hours")]
    pub history_hours: u32,
}

fn default_timeout() -> u64 {
    30
}

fn default_min_refresh() -> u64 {
    30
}

fn default_retry_backoff() -> u64 {
    30
}

fn default_history_hours() -> u32 {
    24
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Key resolution order:
    /// 1. KIS_PUBLIC_KEY / KIS_SECRET_KEY env vars
    /// 2. `public_key` / `secret_key_file` from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.api.endpoint.starts_with("http://")
            && !config.api.endpoint.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "endpoint must start with http:// or https://, got: {}",
                config.api.endpoint
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.api.min_refresh_secs == 0 {
            return Err(common::Error::Config(
                "min_refresh_secs must be greater than 0".into(),
            ));
        }

        if config.api.retry_backoff_secs == 0 {
            return Err(common::Error::Config(
                "retry_backoff_secs must be greater than 0".into(),
            ));
        }

        if config.lookup.machine_uuid.trim().is_empty() {
            return Err(common::Error::Config(
                "lookup.machine_uuid must not be empty".into(),
            ));
        }

        if let Ok(key) = std::env::var("KIS_PUBLIC_KEY") {
            config.api.public_key = Some(key);
        }

        if let Ok(key) = std::env::var("KIS_SECRET_KEY") {
            config.api.secret_key = Some(Secret::new(key));
        } else if let Some(ref key_file) = config.api.secret_key_file {
            let key = std::fs::read_to_string(key_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read secret_key_file {}: {e}",
                    key_file.display()
                ))
            })?;
            let key = Secret::new(key.trim().to_owned());
            if !key.is_blank() {
                config.api.secret_key = Some(key);
            }
        }

        if config.api.public_key.as_deref().is_none_or(str::is_empty) {
            return Err(common::Error::Config(
                "public key missing: set KIS_PUBLIC_KEY or api.public_key".into(),
            ));
        }
        if config.api.secret_key.is_none() {
            return Err(common::Error::Config(
                "secret key missing: set KIS_SECRET_KEY or api.secret_key_file".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("kis.toml")
    }

    /// Client tuning derived from the `[api]` table.
    pub fn client_config(&self) -> ClientConfig {
        let request_timeout = Duration::from_secs(self.api.timeout_secs);
        ClientConfig {
            request_timeout,
            auth: AuthConfig {
                request_timeout,
                min_refresh_interval: Duration::from_secs(self.api.min_refresh_secs),
                retry_backoff: Duration::from_secs(self.api.retry_backoff_secs),
            },
        }
    }
}

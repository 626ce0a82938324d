//! KIS command-line client
//!
//! Authenticates against the configured KIS endpoint, then prints the
//! current state of one machine as JSON:
//! 1. Last known position
//! 2. Position, alarm, and measure history for the configured window
//! 3. Machine master data and subscription registry entry
//!
//! With `--watch`, keeps the process alive and logs background token
//! refreshes until interrupted.

mod config;

use anyhow::{Context, Result};
use kis_client::{DateRange, KisClient, Lookup, RefreshEvent};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Everything the CLI prints for one machine.
#[derive(Debug, Serialize)]
struct MachineReport {
    machine: kis_client::Machine,
    registry: kis_client::Registry,
    last_position: Option<kis_client::Position>,
    positions: Vec<kis_client::Position>,
    alarms: Vec<kis_client::Alarm>,
    measures: Vec<kis_client::Measure>,
}

async fn build_report(client: &KisClient, config: &Config) -> Result<MachineReport> {
    let lookup = Lookup::machine_uuid(config.lookup.machine_uuid.clone());
    let subscription = config.lookup.subscription.as_deref();
    let range = DateRange::last(chrono::Duration::hours(i64::from(
        config.lookup.history_hours,
    )));

    let last_position = client
        .last_position(&lookup, subscription)
        .await
        .context("fetching last position")?;
    let positions = client
        .historical_positions(&lookup, subscription, range)
        .await
        .context("fetching position history")?;
    let machine = client
        .machine(&lookup, subscription)
        .await
        .context("fetching machine")?;
    let registry = client
        .registry(&lookup, subscription)
        .await
        .context("fetching registry")?;
    let alarms = client
        .historical_alarms(&lookup, subscription, range)
        .await
        .context("fetching alarm history")?;
    let measures = client
        .historical_measures(&lookup, subscription, range)
        .await
        .context("fetching measure history")?;

    Ok(MachineReport {
        machine,
        registry,
        last_position,
        positions,
        alarms,
        measures,
    })
}

/// Log refresh events until the channel closes.
async fn log_refresh_events(mut events: tokio::sync::broadcast::Receiver<RefreshEvent>) {
    loop {
        match events.recv().await {
            Ok(RefreshEvent::Refreshed { expires_at }) => {
                info!(%expires_at, "token refreshed");
            }
            Ok(RefreshEvent::Failed { error, retry_in }) => {
                error!(%error, retry_in_secs = retry_in.as_secs(), "token refresh failed");
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "refresh event log lagged");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr as JSON so stdout stays clean for the report
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    // CLI: simple --config / --watch flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());
    let watch = args.iter().any(|a| a == "--watch");

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        endpoint = %config.api.endpoint,
        machine_uuid = %config.lookup.machine_uuid,
        history_hours = config.lookup.history_hours,
        "configuration loaded"
    );

    let public_key = config.api.public_key.clone().unwrap_or_default();
    let secret_key = config
        .api
        .secret_key
        .clone()
        .context("secret key not resolved")?;

    let client = KisClient::connect(
        public_key,
        secret_key,
        config.api.endpoint.clone(),
        config.client_config(),
    )
    .await
    .context("authenticating with KIS")?;

    let event_log = tokio::spawn(log_refresh_events(client.refresh_events()));

    let report = build_report(&client, &config).await;
    match report {
        Ok(report) => {
            let json = serde_json::to_string_pretty(&report).context("serializing report")?;
            println!("{json}");
        }
        Err(e) => {
            client.shutdown().await;
            return Err(e);
        }
    }

    if watch {
        info!("watching token refresh, press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?;
    }

    client.shutdown().await;
    event_log.abort();
    Ok(())
}

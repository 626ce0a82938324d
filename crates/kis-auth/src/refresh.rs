//! Proactive background token refresh
//!
//! Two states: waiting and refreshing. The task sleeps until the current
//! token is one minute from expiry (`ExpiresIn - 1` minutes right after an
//! exchange), then refreshes if the token is within the refresh margin;
//! otherwise it recomputes the wait from the token now installed, which
//! covers tokens replaced by `refresh_now` mid-sleep. A failed refresh
//! keeps the previous token, is published as `RefreshEvent::Failed`, and is
//! retried with exponential backoff capped at the normal interval.
//!
//! The task observes a `CancellationToken` at every suspension point, so a
//! hung exchange cannot outlive the manager.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::REFRESH_MARGIN;
use crate::error::Error;
use crate::manager::Shared;

/// Outcome of a background refresh attempt.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    Refreshed { expires_at: DateTime<Utc> },
    Failed { error: Error, retry_in: Duration },
}

/// Sleep before the next expiry check for a token valid `expires_in` minutes.
///
/// `expires_in - 1` minutes, never less than `floor`.
pub fn refresh_interval(expires_in: i64, floor: Duration) -> Duration {
    let margin_minutes = (REFRESH_MARGIN.as_secs() / 60) as i64;
    let minutes = expires_in.saturating_sub(margin_minutes).max(0) as u64;
    Duration::from_secs(minutes.saturating_mul(60)).max(floor)
}

/// Spawn the refresh loop for `shared`, stopping when `cancel` fires.
pub(crate) fn spawn_refresh_task(
    shared: Arc<Shared>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { refresh_loop(&shared, &cancel).await })
}

async fn refresh_loop(shared: &Shared, cancel: &CancellationToken) {
    let floor = shared.config.min_refresh_interval;
    let mut backoff: Option<Duration> = None;

    loop {
        let current = shared.snapshot();
        let interval = refresh_interval(current.expires_in, floor);
        let wait = backoff.unwrap_or_else(|| current.until_refresh().max(floor));
        debug!(wait_secs = wait.as_secs(), "waiting for next token check");

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("token refresh cancelled");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        if backoff.is_none() && !shared.snapshot().needs_refresh() {
            continue;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("token refresh cancelled mid-exchange");
                return;
            }
            r = shared.exchange() => r,
        };

        match result {
            Ok(state) => {
                backoff = None;
                info!(
                    expires_in_minutes = state.expires_in,
                    expires_at = %state.expires_at,
                    "access token refreshed"
                );
                shared.publish(RefreshEvent::Refreshed {
                    expires_at: state.expires_at,
                });
            }
            Err(error) => {
                let cap = interval.max(shared.config.retry_backoff);
                let retry_in = backoff
                    .map_or(shared.config.retry_backoff, |b| b.saturating_mul(2))
                    .min(cap);
                backoff = Some(retry_in);
                warn!(
                    error = %error,
                    retry_in_secs = retry_in.as_secs(),
                    "background token refresh failed, keeping previous token"
                );
                shared.publish(RefreshEvent::Failed { error, retry_in });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::AuthConfig;
    use crate::manager::CredentialManager;
    use crate::manager::tests::{ScriptedSource, manager, token};
    use std::sync::atomic::Ordering;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn interval_subtracts_one_minute() {
        let floor = Duration::from_secs(30);
        assert_eq!(refresh_interval(10, floor), 9 * MINUTE);
        assert_eq!(refresh_interval(60, floor), 59 * MINUTE);
    }

    #[test]
    fn interval_clamps_short_lifetimes() {
        let floor = Duration::from_secs(30);
        assert_eq!(refresh_interval(1, floor), floor);
        assert_eq!(refresh_interval(0, floor), floor);
        assert_eq!(refresh_interval(-5, floor), floor);
    }

    #[tokio::test(start_paused = true)]
    async fn ten_minute_token_refreshes_between_eight_and_nine_minutes() {
        let source = ScriptedSource::new(vec![token("a", 10), token("b", 10)]);
        let calls = source.calls.clone();
        let mgr = manager(source).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(8 * MINUTE).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "refreshed before T+8min");
        assert_eq!(mgr.token(), "a");

        tokio::time::sleep(MINUTE + Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2, "not refreshed by T+9min");
        assert_eq!(mgr.token(), "b");
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sixty_minute_token_refreshes_once_after_fifty_nine_minutes() {
        let source = ScriptedSource::new(vec![token("abc", 60), token("def", 60)]);
        let calls = source.calls.clone();
        let mgr = manager(source).await;
        assert_eq!(mgr.token(), "abc");

        tokio::time::sleep(59 * MINUTE + Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(mgr.token(), "def");
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_publishes_event() {
        let mgr = manager(ScriptedSource::new(vec![token("a", 2), token("b", 2)])).await;
        let mut events = mgr.subscribe();

        match events.recv().await.unwrap() {
            RefreshEvent::Refreshed { expires_at } => assert_eq!(expires_at, mgr.expires_at()),
            other => panic!("expected Refreshed, got {other:?}"),
        }
        assert_eq!(mgr.token(), "b");
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_is_published_and_retried_with_backoff() {
        let source = ScriptedSource::new(vec![
            token("a", 10),
            Err(Error::Transport("reset".into())),
            Err(Error::Transport("reset".into())),
            token("b", 10),
        ]);
        let calls = source.calls.clone();
        let mgr = manager(source).await;
        let mut events = mgr.subscribe();

        match events.recv().await.unwrap() {
            RefreshEvent::Failed { error, retry_in } => {
                assert!(matches!(error, Error::Transport(_)));
                assert_eq!(retry_in, Duration::from_secs(30));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(mgr.token(), "a", "failed refresh must keep previous token");

        match events.recv().await.unwrap() {
            RefreshEvent::Failed { retry_in, .. } => {
                assert_eq!(retry_in, Duration::from_secs(60));
            }
            other => panic!("expected Failed, got {other:?}"),
        }

        assert!(matches!(
            events.recv().await.unwrap(),
            RefreshEvent::Refreshed { .. }
        ));
        assert_eq!(mgr.token(), "b");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn short_lifetime_uses_clamped_interval() {
        let source = ScriptedSource::new(vec![token("a", 1), token("b", 1)]);
        let calls = source.calls.clone();
        let mgr = manager(source).await;

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no refresh storm");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn custom_floor_is_respected() {
        let source = ScriptedSource::new(vec![token("a", 0)]);
        let calls = source.calls.clone();
        let config = AuthConfig {
            min_refresh_interval: Duration::from_secs(120),
            ..AuthConfig::default()
        };
        let mgr = CredentialManager::with_source("https://kis.test", "pk", Box::new(source), config)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(119)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn on_demand_refresh_moves_next_wake_up() {
        let source = ScriptedSource::new(vec![token("a", 10), token("b", 10), token("c", 10)]);
        let calls = source.calls.clone();
        let mgr = manager(source).await;

        tokio::time::sleep(5 * MINUTE).await;
        mgr.refresh_now().await.unwrap();
        assert_eq!(mgr.token(), "b");

        // The old schedule wakes at T+9 and finds "b" fresh
        tokio::time::sleep(4 * MINUTE + Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // "b" expires at T+15, so it is replaced at T+14
        tokio::time::sleep(5 * MINUTE).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(mgr.token(), "c");
        assert!(!mgr.state().needs_refresh());
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_backoff_does_not_spin() {
        let source = ScriptedSource::new(vec![
            token("a", 1),
            Err(Error::Transport("reset".into())),
        ])
        .with_delay(Duration::from_millis(10));
        let calls = source.calls.clone();
        let config = AuthConfig {
            min_refresh_interval: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..AuthConfig::default()
        };
        let mgr = CredentialManager::with_source("https://kis.test", "pk", Box::new(source), config)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        let calls = calls.load(Ordering::SeqCst);
        assert!(calls >= 2, "refresh never attempted");
        assert!(calls <= 11, "retried {calls} times in 10s");
        assert_eq!(mgr.token(), "a");
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn no_exchange_after_shutdown() {
        let source = ScriptedSource::new(vec![token("a", 2)]);
        let calls = source.calls.clone();
        let mgr = manager(source).await;
        mgr.shutdown().await;

        tokio::time::sleep(10 * MINUTE).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_manager_cancels_task() {
        let source = ScriptedSource::new(vec![token("a", 2)]);
        let calls = source.calls.clone();
        let mgr = manager(source).await;
        drop(mgr);

        tokio::time::sleep(10 * MINUTE).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

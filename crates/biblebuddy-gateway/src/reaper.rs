use crate::rate_limit::RateLimiter;
use biblebuddy_session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Spawns a task that ends sessions idle for longer than `max_idle`.
///
/// The sweep runs every quarter of `max_idle`, but never more often than once
/// a second. Sessions with a turn in flight are skipped by the store.
pub fn spawn_idle_reaper(
    sessions: Arc<dyn SessionStore>,
    rate_limiter: Arc<RateLimiter>,
    max_idle: Duration,
) -> JoinHandle<()> {
    let period = (max_idle / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sessions.reap_idle(max_idle).await {
                Ok(0) => {}
                Ok(reaped) => info!(reaped, "Reaped idle sessions"),
                Err(e) => error!(error = %e, "Idle session sweep failed"),
            }
            rate_limiter.cleanup(max_idle).await;
        }
    })
}

use biblebuddy_core::{AssistantService, BuddyError, BuddyResult, Run};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Bounds on how long and how often a run's status is polled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Delay before the first status fetch; doubles on each following one.
    pub initial_delay_ms: u64,
    /// Cap on the delay between two fetches.
    pub max_delay_ms: u64,
    /// Maximum number of status fetches per run.
    pub max_attempts: u32,
    /// Wall-clock budget for one run, from creation to terminal status.
    pub timeout_secs: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            max_delay_ms: 4_000,
            max_attempts: 120,
            timeout_secs: 120,
        }
    }
}

impl PollPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(compute_backoff(
            self.initial_delay_ms,
            self.max_delay_ms,
            attempt,
        ))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Re-creates a run that ended in a failure state before giving up.
///
/// The user message is not re-sent; only the run is started again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRetryPolicy {
    /// Extra runs to start after the first one fails. `0` disables retries.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    pub backoff_max_ms: u64,
}

impl Default for RunRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
        }
    }
}

impl RunRetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(compute_backoff(
            self.backoff_base_ms,
            self.backoff_max_ms,
            attempt,
        ))
    }
}

/// `base * 2^attempt`, capped at `max`.
pub fn compute_backoff(base_ms: u64, max_ms: u64, attempt: u32) -> u64 {
    let delay = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    delay.min(max_ms)
}

/// Polls `run` until it reaches a terminal status.
///
/// Fails with [`BuddyError::Timeout`] once the attempt cap or the wall-clock
/// budget is exhausted, and with [`BuddyError::Cancelled`] as soon as
/// `cancel` fires, including while a fetch is in flight.
pub async fn wait_for_terminal(
    service: &dyn AssistantService,
    thread_id: &str,
    mut run: Run,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> BuddyResult<Run> {
    let started = Instant::now();
    let deadline = started + policy.timeout();
    let mut attempts: u32 = 0;

    while !run.status.is_terminal() {
        let now = Instant::now();
        if attempts >= policy.max_attempts || now >= deadline {
            return Err(BuddyError::Timeout {
                attempts,
                elapsed_ms: elapsed_ms(started),
            });
        }

        let delay = policy.delay_for(attempts).min(deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BuddyError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        let run_id = run.id.clone();
        run = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BuddyError::Cancelled),
            fetched = service.retrieve_run(thread_id, &run_id) => fetched?,
        };
        attempts += 1;

        debug!(
            thread_id,
            run_id = %run.id,
            status = %run.status,
            attempt = attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Polled run status"
        );
    }

    Ok(run)
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

//! Retry policy for transcode attempts.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt in milliseconds. Zero re-runs immediately.
    pub initial_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 0,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            use_jitter: false,
        }
    }
}

impl RetryConfig {
    /// `attempts` tries with no pause in between.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.initial_delay_ms == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay_ms as f64
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1) as i32);

        let delay_ms = base_delay.min(self.max_delay_ms as f64) as u64;

        let final_delay = if self.use_jitter {
            // Add up to 25% jitter
            let jitter = (delay_ms as f64 * 0.25 * rand::random::<f64>()) as u64;
            delay_ms + jitter
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Whether another attempt follows failed attempt number `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Run `attempt_fn` until it succeeds or the attempts are used up.
///
/// Only [`Error::ProcessFailure`] is retried; any other error ends the loop
/// at once. `on_retry(k, n)` fires after failed attempt `k` when another
/// attempt follows. Cancelling `cancel` aborts a pending backoff sleep with
/// [`Error::Cancelled`]. After the last attempt the last failure is returned.
pub async fn run_with_retries<T, F, Fut, R>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut on_retry: R,
    mut attempt_fn: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    R: FnMut(u32, u32),
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let err = match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_process_failure() => e,
            Err(e) => return Err(e),
        };

        if attempt >= max_attempts {
            warn!(attempt, max_attempts, error = %err, "Giving up after final attempt");
            return Err(err);
        }

        debug!(attempt, max_attempts, error = %err, "Attempt failed, retrying");
        on_retry(attempt, max_attempts);

        let delay = config.delay_for_attempt(attempt);
        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        attempt += 1;
    }
}

// ── Exponential-backoff retry ──
//
// `delay(i) = base_delay * 2^i` after the i-th failed attempt (0-indexed),
// with no delay after the final attempt. The last failure is returned
// unchanged once attempts are exhausted.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Retry schedule for [`with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Backoff applied after failed attempt `attempt` (0-indexed).
    ///
    /// `base * 2^attempt`, saturating at `Duration::MAX`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2_u32
            .checked_pow(attempt)
            .map_or(Duration::MAX, |factor| self.base_delay.saturating_mul(factor))
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached.
///
/// Emits no notifications; callers compose it around gateway calls.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt + 1 < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(error = %err, attempt, ?delay, "operation failed, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(error = %err, attempts = max_attempts, "operation failed, giving up");
                return Err(err);
            }
        }
    }
}

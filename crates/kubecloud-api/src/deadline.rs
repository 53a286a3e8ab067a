// ── Request deadlines ──
//
// A `CancellationToken` armed by a timer task. Guarded futures are raced
// against the token; when it fires, the future is dropped (aborting the
// in-flight call) and the outcome is a distinguished timeout error.
// Dropping the `Deadline` aborts the timer, so no timer outlives its request.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::Error;

/// A cancellation token that fires automatically after `timeout`.
pub struct Deadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
    timeout: Duration,
}

impl Deadline {
    /// Arm a new deadline. Must be called from within a Tokio runtime.
    pub fn start(timeout: Duration) -> Self {
        let token = CancellationToken::new();
        let fire = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            trace!(?timeout, "request deadline fired");
            fire.cancel();
        });

        Self {
            token,
            timer,
            timeout,
        }
    }

    /// The underlying token, for callers that want to observe it directly.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `true` once the deadline has fired.
    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `true` while the timer task is still pending.
    pub fn is_armed(&self) -> bool {
        !self.timer.is_finished() && !self.token.is_cancelled()
    }

    /// Drive `fut` to completion unless the deadline fires first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Error::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            result = fut => result,
        }
    }

    /// Disarm the timer explicitly. Equivalent to dropping the deadline.
    pub fn clear(self) {
        drop(self);
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_timeout() {
        let deadline = Deadline::start(Duration::from_millis(100));
        let result: Result<(), Error> = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(Error::Timeout { timeout_ms: 100 })));
        assert!(deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn fast_future_wins() {
        let deadline = Deadline::start(Duration::from_millis(100));
        let result = deadline.run(async { Ok::<_, Error>(7) }).await;

        assert_eq!(result.ok(), Some(7));
        assert!(deadline.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_disarms_timer() {
        let deadline = Deadline::start(Duration::from_millis(50));
        let token = deadline.token().clone();
        deadline.clear();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!token.is_cancelled(), "cleared deadline must never fire");
    }
}

// ── Loading tracker ──
//
// Observable progress state for a long-running operation: `{is_loading,
// progress, message, error}`. `complete` jumps to 100% and resets the
// flag and progress 500 ms later; a `start` in between cancels that reset.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::AbortHandle;

const DEFAULT_MESSAGE: &str = "Loading...";
const COMPLETE_RESET: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct LoadingState {
    pub is_loading: bool,
    /// Percent, clamped to `[0, 100]`.
    pub progress: f64,
    pub message: String,
    pub error: Option<String>,
}

/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct LoadingTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    state: watch::Sender<LoadingState>,
    initial_message: String,
    reset: Mutex<Option<AbortHandle>>,
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE)
    }
}

impl LoadingTracker {
    pub fn new(initial_message: impl Into<String>) -> Self {
        let initial_message = initial_message.into();
        let (state, _) = watch::channel(LoadingState {
            is_loading: false,
            progress: 0.0,
            message: initial_message.clone(),
            error: None,
        });
        Self {
            inner: Arc::new(TrackerInner {
                state,
                initial_message,
                reset: Mutex::new(None),
            }),
        }
    }

    pub fn start(&self, message: Option<&str>) {
        self.cancel_reset();
        let message = message.unwrap_or(self.inner.initial_message.as_str()).to_owned();
        self.inner.state.send_modify(|s| {
            s.is_loading = true;
            s.progress = 0.0;
            s.message = message;
            s.error = None;
        });
    }

    pub fn update_progress(&self, progress: f64, message: Option<&str>) {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 100.0) };
        self.inner.state.send_modify(|s| {
            s.progress = progress;
            if let Some(message) = message {
                message.clone_into(&mut s.message);
            }
        });
    }

    pub fn set_message(&self, message: &str) {
        self.inner
            .state
            .send_modify(|s| message.clone_into(&mut s.message));
    }

    /// Record a failure; also ends loading.
    pub fn set_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.inner.state.send_modify(|s| {
            s.error = Some(error);
            s.is_loading = false;
        });
    }

    /// Jump to 100% and reset loading/progress shortly after. Requires a
    /// Tokio runtime.
    pub fn complete(&self, message: Option<&str>) {
        self.inner.state.send_modify(|s| {
            s.progress = 100.0;
            if let Some(message) = message {
                message.clone_into(&mut s.message);
            }
        });

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(reset_after(weak, COMPLETE_RESET)).abort_handle();
        if let Some(previous) = self.lock_reset().replace(handle) {
            previous.abort();
        }
    }

    pub fn stop(&self) {
        self.cancel_reset();
        self.inner.state.send_modify(|s| {
            s.is_loading = false;
            s.progress = 0.0;
            s.error = None;
        });
    }

    pub fn reset(&self) {
        self.cancel_reset();
        let message = self.inner.initial_message.clone();
        self.inner.state.send_modify(|s| {
            s.is_loading = false;
            s.progress = 0.0;
            s.message = message;
            s.error = None;
        });
    }

    /// Run `operation` between `start` and `complete`, recording its
    /// failure message before returning the error.
    pub async fn with_loading<T, E, Fut>(
        &self,
        operation: Fut,
        loading_message: Option<&str>,
        success_message: Option<&str>,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.start(loading_message);
        self.finish(operation.await, success_message)
    }

    /// Like [`with_loading`](Self::with_loading), handing the operation a
    /// tracker clone for progress updates.
    pub async fn with_progress<T, E, F, Fut>(
        &self,
        operation: F,
        loading_message: Option<&str>,
        success_message: Option<&str>,
    ) -> Result<T, E>
    where
        F: FnOnce(LoadingTracker) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.start(loading_message);
        let result = operation(self.clone()).await;
        self.finish(result, success_message)
    }

    pub fn state(&self) -> LoadingState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadingState> {
        self.inner.state.subscribe()
    }

    fn finish<T, E: Display>(&self, result: Result<T, E>, success: Option<&str>) -> Result<T, E> {
        match result {
            Ok(value) => {
                self.complete(success);
                Ok(value)
            }
            Err(err) => {
                let message = err.to_string();
                self.set_error(if message.is_empty() { "An error occurred".to_owned() } else { message });
                Err(err)
            }
        }
    }

    fn cancel_reset(&self) {
        if let Some(handle) = self.lock_reset().take() {
            handle.abort();
        }
    }

    fn lock_reset(&self) -> std::sync::MutexGuard<'_, Option<AbortHandle>> {
        self.inner.reset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TrackerInner {
    fn drop(&mut self) {
        let pending = self.reset.get_mut().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = pending {
            handle.abort();
        }
    }
}

async fn reset_after(tracker: Weak<TrackerInner>, delay: Duration) {
    tokio::time::sleep(delay).await;
    if let Some(inner) = tracker.upgrade() {
        inner.state.send_modify(|s| {
            s.is_loading = false;
            s.progress = 0.0;
        });
        inner.reset.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn complete_resets_after_delay() {
        let tracker = LoadingTracker::default();
        tracker.start(Some("Deploying"));
        tracker.update_progress(40.0, None);
        tracker.complete(Some("Done"));

        let state = tracker.state();
        assert!(state.is_loading);
        assert!((state.progress - 100.0).abs() < f64::EPSILON);
        assert_eq!(state.message, "Done");

        tokio::time::sleep(Duration::from_millis(501)).await;
        let state = tracker.state();
        assert!(!state.is_loading);
        assert!(state.progress.abs() < f64::EPSILON);
        assert_eq!(state.message, "Done");
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cancels_pending_reset() {
        let tracker = LoadingTracker::default();
        tracker.start(None);
        tracker.complete(None);
        tracker.start(Some("again"));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(tracker.state().is_loading);
        assert_eq!(tracker.state().message, "again");
    }

    #[test]
    fn progress_is_clamped() {
        let tracker = LoadingTracker::default();
        tracker.update_progress(150.0, Some("over"));
        assert!((tracker.state().progress - 100.0).abs() < f64::EPSILON);
        tracker.update_progress(-3.0, None);
        assert!(tracker.state().progress.abs() < f64::EPSILON);
        assert_eq!(tracker.state().message, "over");
    }

    #[tokio::test(start_paused = true)]
    async fn with_loading_records_failure() {
        let tracker = LoadingTracker::new("Working");
        let result: Result<(), String> = tracker
            .with_loading(async { Err("boom".to_owned()) }, None, None)
            .await;

        assert_eq!(result, Err("boom".to_owned()));
        let state = tracker.state();
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.message, "Working");
    }

    #[tokio::test(start_paused = true)]
    async fn with_progress_exposes_updates() {
        let tracker = LoadingTracker::default();
        let value = tracker
            .with_progress(
                |t| async move {
                    t.update_progress(50.0, Some("halfway"));
                    Ok::<_, String>(7)
                },
                Some("Starting"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(tracker.state().message, "halfway");
        assert!((tracker.state().progress - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_restores_initial_message() {
        let tracker = LoadingTracker::new("Idle");
        tracker.set_message("busy");
        tracker.set_error("bad");
        tracker.reset();
        assert_eq!(tracker.state().message, "Idle");
        assert_eq!(tracker.state().error, None);
    }
}

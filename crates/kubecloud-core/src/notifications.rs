// ── Notification ledger ──
//
// Ordered, self-expiring collection of transient user-facing messages.
// Each entry with a non-zero duration owns one expiry task, tracked in a
// side map keyed by notification id. Removal (explicit, expiry, or
// clear) always drops both the entry and its timer, so no timer ever
// fires for a notification that is already gone.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::stream::{EntityStream, Snapshot};

// ── Types ────────────────────────────────────────────────────────────

/// Unique notification identifier: creation time in milliseconds plus a
/// random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(String);

impl NotificationId {
    fn generate() -> Self {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        Self(format!("{}{suffix}", Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

/// Optional call-to-action attached to a notification.
#[derive(Clone)]
pub struct NotificationAction {
    pub text: String,
    handler: Arc<dyn Fn() + Send + Sync>,
}

impl NotificationAction {
    pub fn new(text: impl Into<String>, handler: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            text: text.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn invoke(&self) {
        (self.handler)();
    }
}

impl fmt::Debug for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationAction")
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

/// A ledger entry.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Lifetime; zero means persistent until dismissed.
    pub duration: Duration,
    pub action: Option<NotificationAction>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_persistent(&self) -> bool {
        self.duration.is_zero()
    }
}

/// A notification before the ledger assigns it an id.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// `None` uses the ledger default; `Some(ZERO)` is persistent.
    pub duration: Option<Duration>,
    pub action: Option<NotificationAction>,
}

impl NewNotification {
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
            duration: None,
            action: None,
        }
    }

    pub fn with_options(mut self, options: NotificationOptions) -> Self {
        if options.duration.is_some() {
            self.duration = options.duration;
        }
        if options.action.is_some() {
            self.action = options.action;
        }
        self
    }
}

/// Overrides accepted by the severity wrappers.
#[derive(Debug, Clone, Default)]
pub struct NotificationOptions {
    pub duration: Option<Duration>,
    pub action: Option<NotificationAction>,
}

impl NotificationOptions {
    pub fn duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            action: None,
        }
    }

    /// Stay until dismissed.
    pub fn persistent() -> Self {
        Self::duration(Duration::ZERO)
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

// ── Ledger ───────────────────────────────────────────────────────────

/// The notification ledger. Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct NotificationLedger {
    inner: Arc<LedgerInner>,
}

struct LedgerInner {
    entries: watch::Sender<Snapshot<Notification>>,
    timers: DashMap<NotificationId, AbortHandle>,
    default_duration: Duration,
}

impl NotificationLedger {
    pub fn new(default_duration: Duration) -> Self {
        let (entries, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(LedgerInner {
                entries,
                timers: DashMap::new(),
                default_duration,
            }),
        }
    }

    /// Append a notification and, if it expires, arm its timer.
    ///
    /// Must be called within a Tokio runtime when the effective duration
    /// is non-zero.
    pub fn add(&self, new: NewNotification) -> NotificationId {
        let id = NotificationId::generate();
        let duration = new.duration.unwrap_or(self.inner.default_duration);

        let notification = Arc::new(Notification {
            id: id.clone(),
            severity: new.severity,
            title: new.title,
            message: new.message,
            duration,
            action: new.action,
            created_at: Utc::now(),
        });
        debug!(
            id = %id,
            severity = %notification.severity,
            title = %notification.title,
            ?duration,
            "notification added"
        );
        self.inner.entries.send_modify(|entries| {
            let mut next = Vec::clone(entries);
            next.push(notification);
            *entries = Arc::new(next);
        });

        if !duration.is_zero() {
            let weak = Arc::downgrade(&self.inner);
            let expiring = id.clone();
            // The shard lock is held until the handle is stored, so the
            // expiry task can never observe a missing timer entry.
            self.inner.timers.entry(id.clone()).or_insert_with(|| {
                tokio::spawn(expire_after(weak, expiring, duration)).abort_handle()
            });
        }

        id
    }

    /// Remove a notification and cancel its timer. No-op if absent.
    pub fn remove(&self, id: &NotificationId) {
        if let Some((_, timer)) = self.inner.timers.remove(id) {
            timer.abort();
        }
        self.inner.drop_entry(id);
    }

    /// Empty the ledger and cancel every outstanding timer.
    pub fn clear_all(&self) {
        self.inner.abort_all();
        self.inner.entries.send_modify(|entries| {
            if !entries.is_empty() {
                *entries = Arc::new(Vec::new());
            }
        });
        debug!("notifications cleared");
    }

    // ── Severity wrappers ────────────────────────────────────────────

    pub fn success(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        options: NotificationOptions,
    ) -> NotificationId {
        self.add(NewNotification::new(Severity::Success, title, message).with_options(options))
    }

    pub fn error(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        options: NotificationOptions,
    ) -> NotificationId {
        self.add(NewNotification::new(Severity::Error, title, message).with_options(options))
    }

    pub fn warning(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        options: NotificationOptions,
    ) -> NotificationId {
        self.add(NewNotification::new(Severity::Warning, title, message).with_options(options))
    }

    pub fn info(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        options: NotificationOptions,
    ) -> NotificationId {
        self.add(NewNotification::new(Severity::Info, title, message).with_options(options))
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot<Notification> {
        self.inner.entries.borrow().clone()
    }

    pub fn get(&self, id: &NotificationId) -> Option<Arc<Notification>> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|n| n.id == *id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of armed expiry timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.len()
    }

    pub fn subscribe(&self) -> EntityStream<Notification> {
        EntityStream::new(self.inner.entries.subscribe())
    }
}

impl fmt::Debug for NotificationLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationLedger")
            .field("len", &self.len())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

impl LedgerInner {
    fn drop_entry(&self, id: &NotificationId) -> bool {
        self.entries.send_if_modified(|entries| {
            if !entries.iter().any(|n| n.id == *id) {
                return false;
            }
            let next: Vec<_> = entries.iter().filter(|n| n.id != *id).cloned().collect();
            *entries = Arc::new(next);
            true
        })
    }

    fn abort_all(&self) {
        self.timers.retain(|_, timer| {
            timer.abort();
            false
        });
    }
}

impl Drop for LedgerInner {
    fn drop(&mut self) {
        self.abort_all();
    }
}

async fn expire_after(ledger: Weak<LedgerInner>, id: NotificationId, duration: Duration) {
    tokio::time::sleep(duration).await;
    let Some(ledger) = ledger.upgrade() else {
        return;
    };
    ledger.timers.remove(&id);
    if ledger.drop_entry(&id) {
        trace!(id = %id, "notification expired");
    }
}

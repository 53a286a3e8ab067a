// ── Notification rendering ──
//
// Prints ledger entries to stderr as they appear. Error notifications are
// skipped: the failing command's error is reported once, by miette.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use kubecloud_core::{Notification, NotificationId, NotificationLedger, Severity};
use tokio::task::JoinHandle;

use crate::output;

type Seen = Arc<Mutex<HashSet<NotificationId>>>;

/// Renders ledger entries on a background task until [`finish`](Self::finish)
/// drains whatever arrived after the last change.
pub struct NotificationPrinter {
    ledger: NotificationLedger,
    color: bool,
    seen: Seen,
    task: Option<JoinHandle<()>>,
}

impl NotificationPrinter {
    /// Start rendering. A quiet printer never spawns and prints nothing.
    pub fn spawn(ledger: &NotificationLedger, color: bool, quiet: bool) -> Self {
        let seen = Seen::default();
        let task = (!quiet).then(|| {
            let mut stream = ledger.subscribe();
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                while let Some(snapshot) = stream.changed().await {
                    print_new(&snapshot, &seen, color);
                }
            })
        });
        Self {
            ledger: ledger.clone(),
            color,
            seen,
            task,
        }
    }

    /// Stop the background task and print anything it has not shown yet.
    pub fn finish(self) {
        let Some(task) = self.task else {
            return;
        };
        task.abort();
        print_new(&self.ledger.snapshot(), &self.seen, self.color);
    }
}

fn print_new(snapshot: &[Arc<Notification>], seen: &Seen, color: bool) {
    let mut seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
    for note in snapshot {
        if note.severity == Severity::Error || !seen.insert(note.id.clone()) {
            continue;
        }
        eprintln!("{}", render(note, color));
    }
}

fn render(note: &Notification, color: bool) -> String {
    let badge = output::severity_badge(note.severity, color);
    if note.message.is_empty() || note.message == note.title {
        format!("{badge} {}", note.title)
    } else {
        format!("{badge} {}: {}", note.title, note.message)
    }
}

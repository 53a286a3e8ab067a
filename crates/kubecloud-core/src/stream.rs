// ── Reactive snapshot streams ──
//
// Subscription handle over a store's `watch` channel of snapshots.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Snapshot type broadcast by every store collection.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A subscription to an ordered collection of entities.
///
/// Offers the snapshot captured at subscription time, the latest
/// snapshot, change notification, and conversion into a `Stream`.
pub struct EntityStream<T: Send + Sync + 'static> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    pub fn latest(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the owning store is gone.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Wait until `predicate` holds for the collection, checking the
    /// latest snapshot first.
    pub async fn wait_until<F>(&mut self, mut predicate: F) -> Option<Snapshot<T>>
    where
        F: FnMut(&[Arc<T>]) -> bool,
    {
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        if predicate(snap.as_slice()) {
            return Some(snap);
        }
        loop {
            let snap = self.changed().await?;
            if predicate(snap.as_slice()) {
                return Some(snap);
            }
        }
    }

    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a fresh snapshot on every mutation.
pub struct EntityWatchStream<T: Send + Sync + 'static> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> Stream for EntityWatchStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

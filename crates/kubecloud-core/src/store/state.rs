// ── Store loading / error state ──

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

/// Observable per-store UI state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// `true` while at least one action is in flight.
    pub is_loading: bool,
    /// Message of the most recent failed action; cleared when an action
    /// begins.
    pub error: Option<String>,
    /// Identifier of the selected entity, if any.
    pub selected: Option<String>,
}

pub(crate) struct StateCell {
    state: watch::Sender<StoreState>,
    in_flight: AtomicUsize,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            state,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Enter the pending state. Loading ends when the guard drops.
    pub(crate) fn begin(&self) -> LoadingGuard<'_> {
        self.state.send_modify(|s| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            s.is_loading = true;
            s.error = None;
        });
        LoadingGuard { cell: self }
    }

    pub(crate) fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.send_modify(|s| s.error = Some(message));
    }

    pub(crate) fn select(&self, id: Option<String>) {
        self.state.send_if_modified(|s| {
            if s.selected == id {
                return false;
            }
            s.selected = id;
            true
        });
    }

    /// Clear the selection if `predicate` holds for the selected id.
    pub(crate) fn clear_selection_if(&self, predicate: impl FnOnce(&str) -> bool) -> bool {
        self.state.send_if_modified(|s| match s.selected.as_deref() {
            Some(id) if predicate(id) => {
                s.selected = None;
                true
            }
            _ => false,
        })
    }

    pub(crate) fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }
}

pub(crate) struct LoadingGuard<'a> {
    cell: &'a StateCell,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.cell.state.send_modify(|s| {
            let previous = self.cell.in_flight.fetch_sub(1, Ordering::SeqCst);
            s.is_loading = previous > 1;
        });
    }
}

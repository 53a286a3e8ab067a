// ── Per-entity action bookkeeping ──
//
// `Transitions` tracks deferred lifecycle transitions (one per entity,
// tagged with a generation so a superseded task can never land).
// `InFlight` is the single-flight guard for network-bound actions.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tokio::task::AbortHandle;
use tracing::trace;

use crate::error::CoreError;

// ── Deferred transitions ─────────────────────────────────────────────

pub(crate) struct Transitions {
    pending: DashMap<String, (u64, AbortHandle)>,
    next_generation: AtomicU64,
}

impl Transitions {
    pub(crate) fn new() -> Self {
        Self {
            pending: DashMap::new(),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Register a deferred transition for `id`, superseding any pending
    /// one. `spawn` receives the new generation and returns the handle of
    /// the task it started; the entry lock is held until the handle is
    /// stored.
    pub(crate) fn schedule(&self, id: &str, spawn: impl FnOnce(u64) -> AbortHandle) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        match self.pending.entry(id.to_owned()) {
            Entry::Occupied(mut slot) => {
                let (_, previous) = slot.insert((generation, spawn(generation)));
                previous.abort();
                trace!(id, generation, "superseded pending transition");
            }
            Entry::Vacant(slot) => {
                slot.insert((generation, spawn(generation)));
            }
        }
    }

    /// Cancel the pending transition for `id`, if any.
    pub(crate) fn cancel(&self, id: &str) -> bool {
        match self.pending.remove(id) {
            Some((_, (generation, task))) => {
                task.abort();
                trace!(id, generation, "cancelled pending transition");
                true
            }
            None => false,
        }
    }

    /// Called by the transition task when its delay elapses. Runs `apply`
    /// and drops the entry only if `generation` is still current; `apply`
    /// runs under the entry lock so a concurrent `cancel` cannot interleave.
    pub(crate) fn complete(&self, id: &str, generation: u64, apply: impl FnOnce()) -> bool {
        self.pending
            .remove_if(id, |_, (current, _)| {
                if *current == generation {
                    apply();
                    true
                } else {
                    false
                }
            })
            .is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }
}

impl Drop for Transitions {
    fn drop(&mut self) {
        for entry in &self.pending {
            entry.value().1.abort();
        }
    }
}

// ── Single-flight guard ──────────────────────────────────────────────

pub(crate) struct InFlight {
    entity: &'static str,
    ids: DashSet<String>,
}

impl InFlight {
    pub(crate) fn new(entity: &'static str) -> Self {
        Self {
            entity,
            ids: DashSet::new(),
        }
    }

    /// Claim `id` for one network-bound action. A second claim while the
    /// first guard is alive fails with [`CoreError::Busy`].
    pub(crate) fn claim(&self, id: &str) -> Result<FlightGuard<'_>, CoreError> {
        if self.ids.insert(id.to_owned()) {
            Ok(FlightGuard {
                owner: self,
                id: id.to_owned(),
            })
        } else {
            Err(CoreError::Busy {
                entity: self.entity,
                identifier: id.to_owned(),
            })
        }
    }
}

pub(crate) struct FlightGuard<'a> {
    owner: &'a InFlight,
    id: String,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.ids.remove(&self.id);
    }
}

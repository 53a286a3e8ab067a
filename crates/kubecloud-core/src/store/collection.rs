// ── Ordered reactive entity collection ──
//
// Insertion order is display order. Every mutation rebuilds the snapshot
// broadcast to subscribers while the write lock is still held, so
// subscribers observe mutations in the order they were applied.

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::model::Entity;
use crate::stream::{EntityStream, Snapshot};

pub(crate) struct EntityCollection<T: Entity> {
    items: RwLock<IndexMap<String, Arc<T>>>,
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Entity> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            items: RwLock::new(IndexMap::new()),
            snapshot,
        }
    }

    /// Replace the whole collection, keeping the given order.
    pub(crate) fn replace_all(&self, entities: Vec<T>) {
        let mut items = self.write();
        *items = entities
            .into_iter()
            .map(|e| (e.id().to_owned(), Arc::new(e)))
            .collect();
        self.publish(&items);
    }

    /// Append an entity. An existing entity with the same id is replaced
    /// in place.
    pub(crate) fn push(&self, entity: T) -> Arc<T> {
        let entity = Arc::new(entity);
        let mut items = self.write();
        items.insert(entity.id().to_owned(), Arc::clone(&entity));
        self.publish(&items);
        entity
    }

    /// Mutate one entity in place. Returns the updated entity, or `None`
    /// if no entity has that id.
    pub(crate) fn modify(&self, id: &str, f: impl FnOnce(&mut T)) -> Option<Arc<T>> {
        let mut items = self.write();
        let slot = items.get_mut(id)?;
        f(Arc::make_mut(slot));
        let updated = Arc::clone(slot);
        self.publish(&items);
        Some(updated)
    }

    pub(crate) fn remove(&self, id: &str) -> Option<Arc<T>> {
        let mut items = self.write();
        let removed = items.shift_remove(id)?;
        self.publish(&items);
        Some(removed)
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }

    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> EntityStream<T> {
        EntityStream::new(self.snapshot.subscribe())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<T>>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, items: &IndexMap<String, Arc<T>>) {
        let values: Vec<Arc<T>> = items.values().cloned().collect();
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::entry::Entry;
use crate::types::identifiers::{CreatedOrder, EntryId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No entry with created order {0}")]
    UnknownEntry(CreatedOrder),
}

/// Returned by every mutation: where the entry landed and the generation
/// the store moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHandle {
    pub created_order: CreatedOrder,
    pub generation: u64,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    generation: u64,
    // entries[i].created_order() == i
    entries: Vec<Arc<Entry>>,
    by_id: BTreeMap<EntryId, Vec<CreatedOrder>>,
}

/// Consistent view of the store at a single generation.
///
/// Holding a snapshot never blocks writers; they copy the state instead.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    state: Arc<StoreState>,
}

impl StoreSnapshot {
    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    /// Entries ordered by `created_order`.
    pub fn entries(&self) -> &[Arc<Entry>] {
        &self.state.entries
    }

    pub fn get(&self, id: EntryId) -> Vec<Arc<Entry>> {
        self.state
            .by_id
            .get(&id)
            .map(|orders| orders.iter().filter_map(|o| self.get_by_order(*o)).collect())
            .unwrap_or_default()
    }

    pub fn get_by_order(&self, order: CreatedOrder) -> Option<Arc<Entry>> {
        usize::try_from(order.get())
            .ok()
            .and_then(|idx| self.state.entries.get(idx))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }
}

/// Owner of every entry.
///
/// Writers are serialized behind the lock and copy the state when readers
/// still hold a snapshot; readers only ever clone an `Arc`.
#[derive(Debug, Default)]
pub struct EntryStore {
    state: RwLock<Arc<StoreState>>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Entry>,
    {
        let store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    /// Append an entry, assigning the next `created_order`.
    pub fn insert(&self, entry: Entry) -> StoreHandle {
        let mut guard = self.state.write();
        let state = Arc::make_mut(&mut *guard);

        let order = CreatedOrder::new(state.entries.len() as u64);
        let entry = entry.with_created_order(order);
        let id = entry.id();

        state.entries.push(Arc::new(entry));
        state.by_id.entry(id).or_default().push(order);
        state.generation += 1;

        tracing::debug!(id = %id, order = %order, generation = state.generation, "inserted entry");

        StoreHandle {
            created_order: order,
            generation: state.generation,
        }
    }

    /// Swap the entry stored at `order`, keeping its position.
    pub fn replace(&self, order: CreatedOrder, entry: Entry) -> Result<StoreHandle, StoreError> {
        let mut guard = self.state.write();
        let idx = usize::try_from(order.get())
            .ok()
            .filter(|idx| *idx < guard.entries.len())
            .ok_or(StoreError::UnknownEntry(order))?;

        let state = Arc::make_mut(&mut *guard);
        let entry = entry.with_created_order(order);
        let old_id = state.entries[idx].id();
        let new_id = entry.id();

        if old_id != new_id {
            if let Some(orders) = state.by_id.get_mut(&old_id) {
                orders.retain(|o| *o != order);
                if orders.is_empty() {
                    state.by_id.remove(&old_id);
                }
            }
            let orders = state.by_id.entry(new_id).or_default();
            let pos = orders.partition_point(|o| *o < order);
            orders.insert(pos, order);
        }

        state.entries[idx] = Arc::new(entry);
        state.generation += 1;

        tracing::debug!(id = %new_id, order = %order, generation = state.generation, "replaced entry");

        Ok(StoreHandle {
            created_order: order,
            generation: state.generation,
        })
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            state: Arc::clone(&self.state.read()),
        }
    }

    /// All entries sharing `id`, ordered by `created_order`.
    pub fn get(&self, id: EntryId) -> Vec<Arc<Entry>> {
        self.snapshot().get(id)
    }

    pub fn get_by_order(&self, order: CreatedOrder) -> Option<Arc<Entry>> {
        self.snapshot().get_by_order(order)
    }

    pub fn all(&self) -> Vec<Arc<Entry>> {
        self.snapshot().entries().to_vec()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids that head more than one entry, with every order they occur at.
    pub fn duplicate_ids(&self) -> BTreeMap<EntryId, Vec<CreatedOrder>> {
        self.state
            .read()
            .by_id
            .iter()
            .filter(|(_, orders)| orders.len() > 1)
            .map(|(id, orders)| (*id, orders.clone()))
            .collect()
    }
}

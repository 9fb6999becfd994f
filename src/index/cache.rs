use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::index::builder::{Index, IndexBuilder};
use crate::store::{EntryStore, StoreSnapshot};

/// Generation-tagged cell holding the most recent index.
///
/// Readers get the cached index when its generation matches the store's.
/// Otherwise the index is rebuilt outside any lock and installed with a
/// compare-and-swap loop that never replaces a newer index with an older
/// one. Concurrent rebuilds of one generation produce equal indices, so
/// whichever lands first is kept.
#[derive(Debug, Default)]
pub struct IndexCache {
    cell: ArcSwapOption<Index>,
    builder: IndexBuilder,
    rebuilds: AtomicU64,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_rebuild(&self, store: &EntryStore) -> Arc<Index> {
        self.get_or_rebuild_snapshot(&store.snapshot())
    }

    /// Index matching exactly this snapshot's generation.
    pub fn get_or_rebuild_snapshot(&self, snapshot: &StoreSnapshot) -> Arc<Index> {
        let generation = snapshot.generation();

        let current = self.cell.load_full();
        if let Some(index) = &current {
            if index.generation() == generation {
                return Arc::clone(index);
            }
        }

        let fresh = Arc::new(self.builder.build_snapshot(snapshot));
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            stale = current.as_ref().map(|i| i.generation()),
            generation,
            "index rebuilt"
        );

        // Compare-and-swap loop: an index at least as new as ours stays.
        self.cell.rcu(|cell| match cell {
            Some(installed) if installed.generation() >= generation => Some(Arc::clone(installed)),
            _ => Some(Arc::clone(&fresh)),
        });

        fresh
    }

    /// The cached index, if any, without checking staleness.
    pub fn peek(&self) -> Option<Arc<Index>> {
        self.cell.load_full()
    }

    pub fn invalidate(&self) {
        self.cell.store(None);
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }
}

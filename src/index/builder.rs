use std::collections::{BTreeMap, BTreeSet};

use crate::entry::Entry;
use crate::index::tokenizer::tokenize;
use crate::store::{EntryStore, StoreSnapshot};
use crate::types::identifiers::CreatedOrder;

pub type Postings = BTreeSet<CreatedOrder>;

/// Inverted index over one store generation.
///
/// Holds only `CreatedOrder` back-references; entry content stays in the
/// store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    generation: u64,
    entry_count: usize,
    token_postings: BTreeMap<String, Postings>,
    tag_postings: BTreeMap<String, Postings>,
}

impl Index {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn token_count(&self) -> usize {
        self.token_postings.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tag_postings.len()
    }

    pub fn token_postings(&self, token: &str) -> Option<&Postings> {
        self.token_postings.get(token)
    }

    pub fn tag_postings(&self, tag: &str) -> Option<&Postings> {
        self.tag_postings.get(tag)
    }

    pub fn tokens(&self) -> impl Iterator<Item = (&str, &Postings)> {
        self.token_postings.iter().map(|(t, p)| (t.as_str(), p))
    }

    pub fn tags(&self) -> impl Iterator<Item = (&str, &Postings)> {
        self.tag_postings.iter().map(|(t, p)| (t.as_str(), p))
    }

    pub fn is_stale(&self, store: &EntryStore) -> bool {
        self.generation != store.generation()
    }
}

/// Pure function of a store snapshot: same snapshot, same index.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBuilder;

impl IndexBuilder {
    pub fn build(&self, store: &EntryStore) -> Index {
        self.build_snapshot(&store.snapshot())
    }

    pub fn build_snapshot(&self, snapshot: &StoreSnapshot) -> Index {
        let mut index = Index {
            generation: snapshot.generation(),
            entry_count: snapshot.len(),
            ..Index::default()
        };

        for entry in snapshot.entries() {
            let order = entry.created_order();
            for token in entry_tokens(entry) {
                index.token_postings.entry(token).or_default().insert(order);
            }
            for tag in entry.tags().iter() {
                index
                    .tag_postings
                    .entry(tag.to_string())
                    .or_default()
                    .insert(order);
            }
        }

        tracing::debug!(
            generation = index.generation,
            entries = index.entry_count,
            tokens = index.token_postings.len(),
            tags = index.tag_postings.len(),
            "built index"
        );

        index
    }
}

/// Tokens of the title and every segment, code included.
pub fn entry_tokens(entry: &Entry) -> impl Iterator<Item = String> + '_ {
    tokenize(entry.title()).chain(
        entry
            .segments()
            .iter()
            .flat_map(|segment| tokenize(segment.content())),
    )
}

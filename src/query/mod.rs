pub mod ranking;
pub mod limit;

use std::cmp::Ordering;
use std::sync::Arc;

use crate::index::{Index, IndexBuilder, IndexCache, Postings};
use crate::store::{EntryStore, StoreSnapshot};
use crate::types::{
	NormalizedQuery, QueryError, RankedEntry, SearchMetadata, SearchRequest, SearchResult,
};
pub use ranking::{Ranker, TitleMatchRanker};
pub use limit::{apply_limit, LimitResult};

/// Search `store` once, building a throwaway index for the call.
///
/// Callers issuing many searches should hold a [`QueryEngine`], which
/// reuses the index until the store changes.
pub fn search(store: &EntryStore, request: &SearchRequest) -> Result<SearchResult, QueryError> {
	let query = request.normalize()?;
	let snapshot = store.snapshot();
	let index = match query {
		NormalizedQuery::Id(_) => None,
		NormalizedQuery::Filter { .. } => Some(IndexBuilder.build_snapshot(&snapshot)),
	};
	Ok(resolve(&TitleMatchRanker, &snapshot, index.as_ref(), &query, request.limit))
}

pub struct QueryEngine<R = TitleMatchRanker> {
	store: Arc<EntryStore>,
	cache: IndexCache,
	ranker: R,
}

impl QueryEngine<TitleMatchRanker> {
	pub fn new(store: Arc<EntryStore>) -> Self {
		Self::with_ranker(store, TitleMatchRanker)
	}
}

impl<R> QueryEngine<R>
where
	R: Ranker,
{
	pub fn with_ranker(store: Arc<EntryStore>, ranker: R) -> Self {
		Self {
			store,
			cache: IndexCache::new(),
			ranker,
		}
	}

	pub fn store(&self) -> &Arc<EntryStore> {
		&self.store
	}

	/// Index for the store's current generation, rebuilt if stale.
	pub fn index(&self) -> Arc<Index> {
		self.cache.get_or_rebuild(&self.store)
	}

	/// How many times the cached index has been rebuilt.
	pub fn rebuilds(&self) -> u64 {
		self.cache.rebuilds()
	}

	pub fn search(&self, request: &SearchRequest) -> Result<SearchResult, QueryError> {
		let query = request.normalize()?;

		// Index and entries must come from the same generation
		let snapshot = self.store.snapshot();
		let index = match query {
			NormalizedQuery::Id(_) => None,
			NormalizedQuery::Filter { .. } => Some(self.cache.get_or_rebuild_snapshot(&snapshot)),
		};

		Ok(resolve(&self.ranker, &snapshot, index.as_deref(), &query, request.limit))
	}
}

fn resolve<R: Ranker>(
	ranker: &R,
	snapshot: &StoreSnapshot,
	index: Option<&Index>,
	query: &NormalizedQuery,
	limit: Option<usize>,
) -> SearchResult {
	// 1. Candidate Phase
	let mut ranked: Vec<RankedEntry> = match (query, index) {
		(NormalizedQuery::Id(id), _) => snapshot
			.get(*id)
			.into_iter()
			.map(|entry| RankedEntry {
				entry,
				title_matches: 0,
			})
			.collect(),
		(NormalizedQuery::Filter { tokens, tags }, Some(index)) => {
			debug_assert_eq!(index.generation(), snapshot.generation());
			candidates(index, tokens, tags)
				.into_iter()
				.filter_map(|order| snapshot.get_by_order(order))
				.map(|entry| {
					let title_matches = ranker.rank(&entry, query);
					RankedEntry {
						entry,
						title_matches,
					}
				})
				.collect()
		}
		(NormalizedQuery::Filter { .. }, None) => Vec::new(),
	};
	let candidates = ranked.len();

	// 2. Ordering Phase
	// Sort globally by (title_matches desc, created_order asc)
	ranked.sort_by(|a, b| {
		match b.title_matches.cmp(&a.title_matches) {
			Ordering::Equal => a.entry.created_order().cmp(&b.entry.created_order()),
			other => other,
		}
	});

	debug_assert!(
		ranked.windows(2).all(|w| {
			let a = &w[0];
			let b = &w[1];
			a.title_matches > b.title_matches
				|| (a.title_matches == b.title_matches
					&& a.entry.created_order() < b.entry.created_order())
		})
	);

	// 3. Limit Phase
	let LimitResult {
		selected,
		returned,
		excluded_by_limit,
	} = apply_limit(ranked, limit);

	let metadata = SearchMetadata {
		generation: snapshot.generation(),
		query_tokens: query.tokens().to_vec(),
		tags: query.tags().to_vec(),
		id: match query {
			NormalizedQuery::Id(id) => Some(*id),
			NormalizedQuery::Filter { .. } => None,
		},
		candidates,
		returned,
		excluded_by_limit,
	};

	tracing::debug!(
		generation = metadata.generation,
		candidates,
		returned,
		"search resolved"
	);

	SearchResult {
		entries: selected,
		search: metadata,
	}
}

/// Intersect the postings of every token and every tag.
///
/// A token or tag missing from the index empties the result.
fn candidates(index: &Index, tokens: &[String], tags: &[String]) -> Postings {
	let lists = tokens
		.iter()
		.map(|token| index.token_postings(token))
		.chain(tags.iter().map(|tag| index.tag_postings(tag)));

	let mut acc: Option<Postings> = None;
	for list in lists {
		let Some(list) = list else {
			return Postings::new();
		};
		let next: Postings = match acc {
			None => list.clone(),
			Some(current) => current.intersection(list).copied().collect(),
		};
		if next.is_empty() {
			return next;
		}
		acc = Some(next);
	}
	acc.unwrap_or_default()
}

use std::collections::BTreeSet;
use std::sync::Arc;

use note_index::entry::{Entry, EntryId};
use note_index::query::Ranker;
use note_index::types::{NormalizedQuery, QueryError, SearchRequest};
use note_index::{ingest, search, EntryStore, ParserConfig, QueryEngine};

const SCENARIO: &str = "\
#1 Title Alpha
```
foo.bar()
```
#2 Title Beta
tags: alpha
uses Alpha techniques
";

const NOTES: &str = "\
#1 Routing basics
tags: routing
Named routes keep paths readable.
#2 Caching pages
tags: caching, performance
Cache whole pages when routing is static.
#3 Fragment caching
tags: caching
Cache partial output.
#4 Query performance
tags: performance
Avoid repeated queries in loops.
";

fn store(raw: &str) -> EntryStore {
    ingest(raw, &ParserConfig::default()).unwrap()
}

fn ids(store: &EntryStore, request: &SearchRequest) -> Vec<u64> {
    search(store, request)
        .unwrap()
        .iter()
        .map(|e| e.id().get())
        .collect()
}

#[test]
fn scenario_title_match_ranks_first() {
    let store = store(SCENARIO);

    assert_eq!(ids(&store, &SearchRequest::by_text("alpha")), vec![1, 2]);
    assert_eq!(ids(&store, &SearchRequest::by_tag("alpha")), vec![2]);

    let by_id = search(&store, &SearchRequest::by_id(1u64)).unwrap().into_entries();
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0].title(), "Title Alpha");
}

#[test]
fn more_title_matches_rank_higher() {
    let store = store(SCENARIO);
    let result = search(&store, &SearchRequest::by_text("title alpha")).unwrap();

    let ranked: Vec<(u64, usize)> = result
        .entries
        .iter()
        .map(|r| (r.entry.id().get(), r.title_matches))
        .collect();
    assert_eq!(ranked, vec![(1, 2), (2, 1)]);
}

#[test]
fn ties_keep_reading_order() {
    let store = store(NOTES);
    // "cache" is only ever in bodies here: every candidate ranks 0
    assert_eq!(ids(&store, &SearchRequest::by_text("cache")), vec![2, 3]);
}

#[test]
fn text_tokens_are_and_combined() {
    let store = store(NOTES);

    assert_eq!(ids(&store, &SearchRequest::by_text("routing")), vec![1, 2]);
    assert_eq!(ids(&store, &SearchRequest::by_text("routing static")), vec![2]);
    assert!(ids(&store, &SearchRequest::by_text("routing loops")).is_empty());
}

#[test]
fn invariant_tag_filter_returns_exactly_tagged_entries() {
    let store = store(NOTES);

    let all_tags: BTreeSet<String> = store
        .all()
        .iter()
        .flat_map(|e| e.tags().iter().map(str::to_string).collect::<Vec<_>>())
        .collect();

    for tag in all_tags {
        let expected: Vec<u64> = store
            .all()
            .iter()
            .filter(|e| e.tags().contains(&tag))
            .map(|e| e.id().get())
            .collect();
        assert_eq!(ids(&store, &SearchRequest::by_tag(tag.clone())), expected, "tag {tag}");
    }
}

#[test]
fn tags_are_and_combined_and_normalized() {
    let store = store(NOTES);

    let request = SearchRequest::by_tag("CACHING").with_tag(" performance ");
    assert_eq!(ids(&store, &request), vec![2]);
}

#[test]
fn text_and_tags_combine() {
    let store = store(NOTES);

    let request = SearchRequest::by_text("cache").with_tag("performance");
    assert_eq!(ids(&store, &request), vec![2]);
}

#[test]
fn invariant_empty_query_is_rejected() {
    let store = store(NOTES);

    let err = search(&store, &SearchRequest::new()).unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery(_)));

    // selectors that normalize to nothing count as absent
    assert!(search(&store, &SearchRequest::by_text("  ?! ")).is_err());
    assert!(search(&store, &SearchRequest::by_tag("   ")).is_err());
    assert!(search(&store, &SearchRequest::new().with_limit(3)).is_err());
}

#[test]
fn unmatched_query_is_empty_not_an_error() {
    let store = store(NOTES);

    let result = search(&store, &SearchRequest::by_text("nonexistent")).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.search.candidates, 0);

    assert!(ids(&store, &SearchRequest::by_tag("unknown")).is_empty());
    assert!(ids(&store, &SearchRequest::by_id(99u64)).is_empty());
}

#[test]
fn id_lookup_ignores_other_selectors() {
    let store = store(NOTES);

    let request = SearchRequest::by_id(3u64)
        .with_text("routing")
        .with_tag("performance");
    assert_eq!(ids(&store, &request), vec![3]);
}

#[test]
fn id_lookup_returns_all_duplicates() {
    let store = store("#7 First\na\n#7 Second\nb\n");
    let result = search(&store, &SearchRequest::by_id(EntryId::new(7))).unwrap();

    let titles: Vec<&str> = result.iter().map(|e| e.title()).collect();
    assert_eq!(titles, vec!["First", "Second"]);
    assert_eq!(result.search.id, Some(EntryId::new(7)));
}

#[test]
fn limit_truncates_ranked_results() {
    let store = store(NOTES);

    let result = search(&store, &SearchRequest::by_tag("caching").with_limit(1)).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.entries[0].entry.id(), EntryId::new(2));
    assert_eq!(result.search.candidates, 2);
    assert_eq!(result.search.returned, 1);
    assert_eq!(result.search.excluded_by_limit, 1);

    let none = search(&store, &SearchRequest::by_tag("caching").with_limit(0)).unwrap();
    assert!(none.is_empty());
    assert_eq!(none.search.excluded_by_limit, 2);

    let generous = search(&store, &SearchRequest::by_tag("caching").with_limit(10)).unwrap();
    assert_eq!(generous.len(), 2);
    assert_eq!(generous.search.excluded_by_limit, 0);
}

#[test]
fn metadata_describes_normalized_query() {
    let store = store(NOTES);
    let result = search(
        &store,
        &SearchRequest::by_text("Routing ROUTING basics").with_tag("Routing"),
    )
    .unwrap();

    assert_eq!(result.search.query_tokens, vec!["basics", "routing"]);
    assert_eq!(result.search.tags, vec!["routing"]);
    assert_eq!(result.search.generation, store.generation());
    assert_eq!(result.search.id, None);
}

#[test]
fn request_deserializes_from_json() {
    let request: SearchRequest =
        serde_json::from_str(r#"{"text": "alpha", "tags": ["x"], "limit": 5}"#).unwrap();

    assert_eq!(request, SearchRequest::by_text("alpha").with_tag("x").with_limit(5));

    let empty: SearchRequest = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, SearchRequest::new());
}

/// Ranks by number of tags, to check the engine honours a custom ranker.
struct TagCountRanker;

impl Ranker for TagCountRanker {
    fn rank(&self, entry: &Entry, _query: &NormalizedQuery) -> usize {
        entry.tags().len()
    }
}

#[test]
fn engine_uses_supplied_ranker() {
    let engine = QueryEngine::with_ranker(Arc::new(store(NOTES)), TagCountRanker);

    let result = engine.search(&SearchRequest::by_tag("caching")).unwrap();
    let ranked: Vec<(u64, usize)> = result
        .entries
        .iter()
        .map(|r| (r.entry.id().get(), r.title_matches))
        .collect();
    assert_eq!(ranked, vec![(2, 2), (3, 1)]);
}

//! Deterministic indexing and retrieval for numbered notes.
//!
//! `note-index` parses raw note text (numbered headings followed by prose
//! and verbatim code excerpts) into entries, stores them in ingestion
//! order, builds token and tag inverted indices and answers ranked
//! searches. Identical inputs always produce identical results: ranking
//! ties fall back to reading order.
//!
//! ```
//! use note_index::{ingest, search, ParserConfig, SearchRequest};
//!
//! let raw = "#1 Caching\nMemoize expensive lookups.\n#2 Routing\ntags: web\nNamed routes.\n";
//! let store = ingest(raw, &ParserConfig::default()).unwrap();
//!
//! let hits = search(&store, &SearchRequest::by_text("caching")).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits.entries[0].entry.title(), "Caching");
//! ```

pub mod config;
pub mod entry;
pub mod index;
pub mod query;
pub mod store;
pub mod types;

pub use config::{Config, ConfigError};
pub use entry::{CodeDetector, Entry, ParseError, Parser, ParserConfig, Segment, TagSet};
pub use index::{Index, IndexBuilder, IndexCache};
pub use query::{search, QueryEngine};
pub use store::{EntryStore, StoreHandle};
pub use types::{CreatedOrder, EntryId, QueryError, SearchRequest, SearchResult};

/// Parse `raw` and load every entry into a fresh store.
///
/// All-or-nothing: on a parse error no store is returned.
pub fn ingest(raw: &str, config: &ParserConfig) -> Result<EntryStore, ParseError> {
    let parser = Parser::new(config.clone());
    let store = EntryStore::new();
    for entry in parser.entries(raw) {
        store.insert(entry?);
    }

    let duplicates = store.duplicate_ids();
    if !duplicates.is_empty() {
        tracing::warn!(
            ids = ?duplicates.keys().map(|id| id.get()).collect::<Vec<_>>(),
            "entry numbers used more than once; all occurrences kept"
        );
    }
    tracing::info!(entries = store.len(), generation = store.generation(), "ingested notes");

    Ok(store)
}

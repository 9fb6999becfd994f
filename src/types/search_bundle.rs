use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entry::{normalize_tag, Entry};
use crate::index::tokenizer::distinct_tokens;
use crate::types::identifiers::EntryId;

/// A search request as received from a caller.
///
/// `tags` are AND-combined. `limit` defaults to unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<EntryId>) -> Self {
        Self::new().with_id(id)
    }

    pub fn by_text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    pub fn by_tag(tag: impl Into<String>) -> Self {
        Self::new().with_tag(tag)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(BTreeSet::new).insert(tag.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<EntryId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reduce the request to the selector resolution works with.
    ///
    /// Normalization rules:
    /// - `id` wins over everything else
    /// - text is tokenized exactly like indexed content, duplicates dropped
    /// - tags are trimmed and lowercased, empty ones dropped
    pub fn normalize(&self) -> Result<NormalizedQuery, QueryError> {
        if let Some(id) = self.id {
            return Ok(NormalizedQuery::Id(id));
        }

        let tokens: Vec<String> = self
            .text
            .as_deref()
            .map(|text| distinct_tokens(text).into_iter().collect())
            .unwrap_or_default();

        let tags: Vec<String> = self
            .tags
            .iter()
            .flatten()
            .filter_map(|tag| normalize_tag(tag))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if tokens.is_empty() && tags.is_empty() {
            return Err(QueryError::InvalidQuery(
                "request has no searchable text, tag or id".into(),
            ));
        }

        Ok(NormalizedQuery::Filter { tokens, tags })
    }
}

/// A validated query. Token and tag lists are sorted and distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedQuery {
    Id(EntryId),
    Filter { tokens: Vec<String>, tags: Vec<String> },
}

impl NormalizedQuery {
    pub fn tokens(&self) -> &[String] {
        match self {
            NormalizedQuery::Id(_) => &[],
            NormalizedQuery::Filter { tokens, .. } => tokens,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            NormalizedQuery::Id(_) => &[],
            NormalizedQuery::Filter { tags, .. } => tags,
        }
    }
}

/// An entry in the ranked output, with the figure it was ranked by.
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub entry: Arc<Entry>,
    /// Distinct query tokens found in the entry title.
    pub title_matches: usize,
}

/// Explanation of how a result set came about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub generation: u64,
    pub query_tokens: Vec<String>,
    pub tags: Vec<String>,
    pub id: Option<EntryId>,

    pub candidates: usize,
    pub returned: usize,
    pub excluded_by_limit: usize,
}

/// The final, ranked outcome of a search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub entries: Vec<RankedEntry>,
    pub search: SearchMetadata,
}

impl SearchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ranked order, without ranking detail.
    pub fn into_entries(self) -> Vec<Arc<Entry>> {
        self.entries.into_iter().map(|ranked| ranked.entry).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().map(|ranked| ranked.entry.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

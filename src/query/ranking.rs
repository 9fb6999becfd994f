use crate::entry::Entry;
use crate::index::tokenizer::distinct_tokens;
use crate::types::NormalizedQuery;

pub trait Ranker {
    /// Rank figure for one candidate. Higher sorts first; ties fall back to
    /// `created_order` ascending.
    fn rank(&self, entry: &Entry, query: &NormalizedQuery) -> usize;
}

/// Number of distinct query tokens that occur in the entry title.
///
/// Title matches outrank body-only matches; a pure tag filter ranks every
/// candidate 0 and so keeps reading order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleMatchRanker;

impl Ranker for TitleMatchRanker {
    fn rank(&self, entry: &Entry, query: &NormalizedQuery) -> usize {
        let tokens = query.tokens();
        if tokens.is_empty() || entry.title().is_empty() {
            return 0;
        }
        let title = distinct_tokens(entry.title());
        tokens.iter().filter(|token| title.contains(*token)).count()
    }
}

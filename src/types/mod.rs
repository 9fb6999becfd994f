pub mod identifiers;
pub mod search_bundle;

pub use identifiers::{CreatedOrder, EntryDigest, EntryId};
pub use search_bundle::{
    NormalizedQuery, QueryError, RankedEntry, SearchMetadata, SearchRequest, SearchResult,
};

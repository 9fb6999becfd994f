pub mod tags;
pub mod entry;
pub mod parser;

pub use crate::types::identifiers::{CreatedOrder, EntryDigest, EntryId};
pub use tags::{normalize_tag, TagSet};
pub use entry::{Entry, EntryError, Segment};
pub use parser::{CodeDetector, Entries, ParseError, Parser, ParserConfig};

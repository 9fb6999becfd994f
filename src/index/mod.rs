pub mod tokenizer;
pub mod builder;
pub mod cache;

pub use builder::{entry_tokens, Index, IndexBuilder, Postings};
pub use cache::IndexCache;
pub use tokenizer::{distinct_tokens, tokenize};

use std::collections::BTreeSet;

/// Split text into lowercase alphanumeric fragments.
///
/// Every non-alphanumeric character is a boundary, so `foo.bar()` yields
/// `foo` and `bar`. Code and prose go through the same rules.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_lowercase)
}

/// Distinct tokens of `text`, sorted.
pub fn distinct_tokens(text: &str) -> BTreeSet<String> {
    tokenize(text).collect()
}

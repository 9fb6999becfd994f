use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalize a raw tag: trimmed, lowercased, never empty.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Set of normalized tags. Iteration order is lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet {
    inner: BTreeSet<String>,
}

impl TagSet {
    pub fn new() -> Self {
        TagSet {
            inner: BTreeSet::new(),
        }
    }

    /// Split a tag list on commas and whitespace.
    pub fn parse_list(list: &str) -> Self {
        list.split(|c: char| c == ',' || c.is_whitespace())
            .collect()
    }

    /// Returns false when the tag normalizes to nothing or is already present.
    pub fn insert(&mut self, raw: &str) -> bool {
        match normalize_tag(raw) {
            Some(tag) => self.inner.insert(tag),
            None => false,
        }
    }

    pub fn contains(&self, raw: &str) -> bool {
        normalize_tag(raw).map_or(false, |tag| self.inner.contains(&tag))
    }

    pub fn merge(&mut self, other: TagSet) {
        self.inner.extend(other.inner);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        tags.extend(iter);
        tags
    }
}

impl<S: AsRef<str>> Extend<S> for TagSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for raw in iter {
            self.insert(raw.as_ref());
        }
    }
}

impl From<Vec<String>> for TagSet {
    fn from(raw: Vec<String>) -> Self {
        raw.into_iter().collect()
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.inner.into_iter().collect()
    }
}

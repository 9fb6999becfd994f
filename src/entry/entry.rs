use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::identifiers::{CreatedOrder, EntryDigest, EntryId};
use super::tags::TagSet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("Entry {0} has no segments")]
    NoSegments(EntryId),
}

/// A contiguous span of an entry body.
///
/// Code is an opaque payload: it is stored and tokenized as plain text,
/// never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Text {
        text: String,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        code: String,
    },
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    pub fn code(label: Option<String>, code: impl Into<String>) -> Self {
        Segment::Code {
            label,
            code: code.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Segment::Text { text } => text,
            Segment::Code { code, .. } => code,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Segment::Text { .. } => None,
            Segment::Code { label, .. } => label.as_deref(),
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Segment::Code { .. })
    }
}

/// The atomic unit: one numbered note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EntryRecord")]
pub struct Entry {
    id: EntryId,
    title: String,
    segments: Vec<Segment>,
    tags: TagSet,
    created_order: CreatedOrder,
}

// Deserialization goes through here so stored entries obey the same
// invariants as freshly constructed ones.
#[derive(Deserialize)]
struct EntryRecord {
    id: EntryId,
    title: String,
    segments: Vec<Segment>,
    #[serde(default)]
    tags: TagSet,
    created_order: CreatedOrder,
}

impl TryFrom<EntryRecord> for Entry {
    type Error = EntryError;

    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        let entry = Entry::new(record.id, record.title, record.segments, record.tags)?;
        Ok(entry.with_created_order(record.created_order))
    }
}

impl Entry {
    /// Build an entry. The title is trimmed.
    ///
    /// `created_order` starts at [`CreatedOrder::FIRST`]; the store assigns
    /// the real value on insert.
    pub fn new(
        id: EntryId,
        title: impl Into<String>,
        segments: Vec<Segment>,
        tags: TagSet,
    ) -> Result<Self, EntryError> {
        if segments.is_empty() {
            return Err(EntryError::NoSegments(id));
        }

        let title = title.into().trim().to_string();

        Ok(Entry {
            id,
            title,
            segments,
            tags,
            created_order: CreatedOrder::FIRST,
        })
    }

    pub(crate) fn with_created_order(mut self, created_order: CreatedOrder) -> Self {
        self.created_order = created_order;
        self
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn created_order(&self) -> CreatedOrder {
        self.created_order
    }

    /// Content digest over title, tags and segments.
    ///
    /// Neither `id` nor `created_order` take part: two entries with the same
    /// content hash identically wherever they sit in the store.
    pub fn digest(&self) -> EntryDigest {
        let tag_count = (self.tags.len() as u64).to_le_bytes();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(2 + self.tags.len() + self.segments.len() * 3);
        parts.push(self.title.as_bytes());
        parts.push(&tag_count);
        for tag in self.tags.iter() {
            parts.push(tag.as_bytes());
        }
        for segment in &self.segments {
            match segment {
                Segment::Text { text } => {
                    parts.push(b"text");
                    parts.push(text.as_bytes());
                }
                Segment::Code { label, code } => {
                    parts.push(b"code");
                    parts.push(label.as_deref().unwrap_or("").as_bytes());
                    parts.push(code.as_bytes());
                }
            }
        }
        EntryDigest::from_parts(parts)
    }
}

use crate::DocId;
use serde::{Deserialize, Serialize};

/// Capability of producing the plain text that gets indexed.
pub trait TextExtractable {
    fn extract_text(&self) -> String;
}

/// Anything that can be handed to [`crate::SearchIndex::index`].
///
/// Types that carry text override `text_source` to return `Some(self)`; the
/// default `None` makes indexing fail with `UnsupportedDocument`.
pub trait Document {
    fn id(&self) -> DocId;

    fn text_source(&self) -> Option<&dyn TextExtractable> {
        None
    }
}

/// A titled document whose indexed text is the title followed by the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocument {
    pub id: DocId,
    pub title: String,
    pub body: String,
}

impl TextDocument {
    pub fn new(id: DocId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { id, title: title.into(), body: body.into() }
    }
}

impl TextExtractable for TextDocument {
    fn extract_text(&self) -> String {
        [self.title.as_str(), self.body.as_str()].join(" ")
    }
}

impl Document for TextDocument {
    fn id(&self) -> DocId {
        self.id
    }

    fn text_source(&self) -> Option<&dyn TextExtractable> {
        Some(self)
    }
}

/// Loosely-typed input record (JSON / JSONL). It only exposes text when at
/// least one of `title` or `body` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDocument {
    pub id: DocId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl TextExtractable for RecordDocument {
    fn extract_text(&self) -> String {
        self.title
            .iter()
            .chain(self.body.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Document for RecordDocument {
    fn id(&self) -> DocId {
        self.id
    }

    fn text_source(&self) -> Option<&dyn TextExtractable> {
        if self.title.is_none() && self.body.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::reference::PageRef;

/// One commentary excerpt attached to a segment. `source_name` keys into the style table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentaryEntry {
    pub source_name: String,
    pub text: String,
}

impl CommentaryEntry {
    pub fn new(source_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            text: text.into(),
        }
    }
}

/// One quotable unit of primary text with its commentary, in fetch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub commentaries: Vec<CommentaryEntry>,
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            commentaries: Vec::new(),
        }
    }

    pub fn with_commentaries(text: impl Into<String>, commentaries: Vec<CommentaryEntry>) -> Self {
        Self {
            text: text.into(),
            commentaries,
        }
    }

    /// Stand-in for a page whose text could not be retrieved.
    pub fn placeholder(page: &PageRef) -> Self {
        Self::new(format!("[missing text for {page}]"))
    }
}

/// All segments fetched for one page reference, with its caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePage {
    pub page_ref: PageRef,
    pub header: String,
    pub segments: Vec<Segment>,
}

// ────────────────────────────────────────────────────────────────────────────
// Text-service document shape
// ────────────────────────────────────────────────────────────────────────────

/// A document as returned by the text service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub versions: Vec<TextVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextVersion {
    pub text: TextBody,
}

/// Version text is either one string or a (possibly nested) list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextBody {
    Single(String),
    Many(Vec<TextBody>),
}

impl TextBody {
    fn flatten_into(&self, out: &mut Vec<String>) {
        match self {
            TextBody::Single(s) => out.push(s.clone()),
            TextBody::Many(items) => items.iter().for_each(|item| item.flatten_into(out)),
        }
    }
}

impl SourceDocument {
    /// Flattened text of the first version; empty when the document has none.
    pub fn segments(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(version) = self.versions.first() {
            version.text.flatten_into(&mut out);
        }
        out
    }
}

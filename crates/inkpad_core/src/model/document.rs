//! Document domain model shared by notes and canvases.
//!
//! # Responsibility
//! - Define document identity, kind and the persisted `(title, content)` pair.
//! - Own the title normalization rule used by persistence and fingerprints.
//!
//! # Invariants
//! - `DocumentId` is externally assigned and never reused across documents.
//! - `content` is opaque to core; it is stored and handed back unmodified.
//! - A blank title is always persisted as `"Untitled"`.
//!
//! # See also
//! - crate::autosave::fingerprint

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Title used when the user leaves the title blank.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Stable identifier for one note or canvas.
pub type DocumentId = Uuid;

/// Document flavor persisted by the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Rich-text note; content is an editor JSON tree.
    Note,
    /// Freeform canvas; content is a scene graph.
    Canvas,
}

impl DocumentKind {
    /// Returns the storage text for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Canvas => "canvas",
        }
    }

    /// Parses the storage text for a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "note" => Some(Self::Note),
            "canvas" => Some(Self::Canvas),
            _ => None,
        }
    }

    /// Default quiescence window before an autosave fires.
    pub fn default_debounce(self) -> Duration {
        match self {
            Self::Note => Duration::from_millis(1000),
            Self::Canvas => Duration::from_millis(900),
        }
    }

    /// Object keys that carry editor bookkeeping rather than document meaning.
    ///
    /// These keys are dropped at every depth before fingerprinting.
    pub fn transient_keys(self) -> &'static [&'static str] {
        match self {
            Self::Note => &["selection", "storedMarks"],
            Self::Canvas => &[
                "appState",
                "collaborators",
                "selectedElementIds",
                "selectedGroupIds",
                "editingElement",
            ],
        }
    }

    /// Empty content tree used for brand new documents.
    pub fn empty_content(self) -> Value {
        match self {
            Self::Note => serde_json::json!({
                "type": "doc",
                "content": [{ "type": "paragraph" }],
            }),
            Self::Canvas => serde_json::json!({
                "elements": [],
                "files": {},
            }),
        }
    }
}

/// Persisted state of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Raw title as typed; see [`DocumentSnapshot::normalized_title`].
    pub title: String,
    /// Opaque structured body.
    pub content: Value,
}

impl DocumentSnapshot {
    pub fn new(title: impl Into<String>, content: Value) -> Self {
        Self {
            title: title.into(),
            content,
        }
    }

    /// Creates an untitled snapshot with the kind's empty content.
    pub fn empty(kind: DocumentKind) -> Self {
        Self::new(DEFAULT_TITLE, kind.empty_content())
    }

    /// Title as persisted: trimmed, falling back to `"Untitled"`.
    pub fn normalized_title(&self) -> &str {
        normalize_title(&self.title)
    }
}

/// Trims a title and substitutes `"Untitled"` when nothing is left.
pub fn normalize_title(title: &str) -> &str {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        DEFAULT_TITLE
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_title, DocumentKind, DocumentSnapshot};

    #[test]
    fn blank_titles_normalize_to_untitled() {
        assert_eq!(normalize_title("   "), "Untitled");
        assert_eq!(normalize_title(""), "Untitled");
        assert_eq!(normalize_title("  Groceries \n"), "Groceries");
    }

    #[test]
    fn kind_round_trips_through_storage_text() {
        for kind in [DocumentKind::Note, DocumentKind::Canvas] {
            assert_eq!(DocumentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DocumentKind::parse("task"), None);
    }

    #[test]
    fn empty_note_snapshot_is_untitled_paragraph() {
        let snapshot = DocumentSnapshot::empty(DocumentKind::Note);
        assert_eq!(snapshot.normalized_title(), "Untitled");
        assert_eq!(snapshot.content["type"], "doc");
    }
}

//! Live, continuously mutated editor model.
//!
//! # Responsibility
//! - Define the read/replace contract the autosave engine needs from an editor.
//! - Provide a reference editor model and a shared single-writer handle.
//!
//! # Invariants
//! - `snapshot()` returns only persisted meaning; undo history and selection
//!   state never appear in it.
//! - The UI layer is the only writer; the engine reads, except during hydration.

use crate::model::document::{DocumentKind, DocumentSnapshot};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;
use std::sync::Arc;

/// Contract between an editor model and the autosave engine.
pub trait LiveModel {
    /// Reads the current `(title, content)` pair.
    fn snapshot(&self) -> DocumentSnapshot;
    /// Replaces model state with a persisted snapshot (hydration only).
    fn load_snapshot(&mut self, snapshot: &DocumentSnapshot);
}

/// Selection range inside the editor. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

/// Reference editor model for notes and canvases.
#[derive(Debug, Clone)]
pub struct EditorDocument {
    title: String,
    content: Value,
    undo_stack: Vec<DocumentSnapshot>,
    selection: Option<Selection>,
}

impl EditorDocument {
    /// Creates an empty untitled editor for the given kind.
    pub fn new(kind: DocumentKind) -> Self {
        let empty = DocumentSnapshot::empty(kind);
        Self {
            title: empty.title,
            content: empty.content,
            undo_stack: Vec::new(),
            selection: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Edits the title, recording the previous state for undo.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.push_undo();
        self.title = title.into();
    }

    /// Replaces the content tree, recording the previous state for undo.
    pub fn set_content(&mut self, content: Value) {
        self.push_undo();
        self.content = content;
    }

    /// Moves the cursor. Does not change persisted meaning.
    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Restores the previous title/content pair, if any.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.title = previous.title;
                self.content = previous.content;
                true
            }
            None => false,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    fn push_undo(&mut self) {
        self.undo_stack
            .push(DocumentSnapshot::new(self.title.clone(), self.content.clone()));
    }
}

impl LiveModel for EditorDocument {
    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot::new(self.title.clone(), self.content.clone())
    }

    fn load_snapshot(&mut self, snapshot: &DocumentSnapshot) {
        self.title = snapshot.title.clone();
        self.content = snapshot.content.clone();
        // Loaded state is the new origin; history from a previous identity is meaningless.
        self.undo_stack.clear();
        self.selection = None;
    }
}

/// Shared handle to a live model, cloned between the UI layer and the engine.
pub struct SharedModel<M> {
    inner: Arc<RwLock<M>>,
}

impl<M> SharedModel<M> {
    pub fn new(model: M) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, M> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, M> {
        self.inner.write()
    }

    /// Applies one edit under the write lock.
    pub fn edit<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.inner.write())
    }
}

impl<M> Clone for SharedModel<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: LiveModel> SharedModel<M> {
    pub fn snapshot(&self) -> DocumentSnapshot {
        self.inner.read().snapshot()
    }
}

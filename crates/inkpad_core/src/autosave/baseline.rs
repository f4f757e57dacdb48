//! Baseline of the last durably persisted state.
//!
//! # Invariants
//! - The baseline is written by hydration seeding and by successful saves only.
//! - A commit for a different identity than the seeded one is refused.

use crate::autosave::fingerprint::Fingerprint;
use crate::model::document::DocumentId;

/// Fingerprint of the last persisted snapshot plus its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub document_id: DocumentId,
    pub fingerprint: Fingerprint,
}

/// Holds at most one baseline, scoped to the current identity.
#[derive(Debug, Default)]
pub struct BaselineStore {
    current: Option<Baseline>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Baseline> {
        self.current.as_ref()
    }

    /// Seeds the baseline after hydration, replacing any previous identity.
    pub fn seed(&mut self, document_id: DocumentId, fingerprint: Fingerprint) {
        self.current = Some(Baseline {
            document_id,
            fingerprint,
        });
    }

    /// Records a successful save. Returns `false` when `document_id` is not
    /// the identity this store was seeded for.
    pub fn commit(&mut self, document_id: DocumentId, fingerprint: Fingerprint) -> bool {
        match self.current.as_mut() {
            Some(baseline) if baseline.document_id == document_id => {
                baseline.fingerprint = fingerprint;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

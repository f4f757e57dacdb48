//! Dirty-state tracking against the persisted baseline.

use crate::autosave::baseline::Baseline;
use crate::autosave::fingerprint::{Canonicalizer, Fingerprint};
use crate::model::document::DocumentSnapshot;

/// Decides whether the live snapshot differs from what was last persisted.
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    canonicalizer: Canonicalizer,
}

impl DirtyTracker {
    pub fn new(canonicalizer: Canonicalizer) -> Self {
        Self { canonicalizer }
    }

    pub fn fingerprint(&self, snapshot: &DocumentSnapshot) -> Fingerprint {
        self.canonicalizer.fingerprint(snapshot)
    }

    /// Compares by fingerprint value. With no baseline everything is dirty.
    pub fn is_dirty(&self, live: &DocumentSnapshot, baseline: Option<&Baseline>) -> bool {
        match baseline {
            Some(baseline) => self.fingerprint(live) != baseline.fingerprint,
            None => true,
        }
    }
}

//! One-time hydration of a live model from its persisted snapshot.
//!
//! # Responsibility
//! - Load the persisted snapshot into the live model once per identity.
//! - Seed the baseline from the hydrated model so loading is never an edit.
//!
//! # Invariants
//! - Until `Hydrated`, the tracker and scheduler must treat mutations as noise.
//! - Hydrating the same identity twice is a no-op.

use crate::autosave::baseline::BaselineStore;
use crate::autosave::fingerprint::Fingerprint;
use crate::autosave::tracker::DirtyTracker;
use crate::model::document::{DocumentId, DocumentSnapshot};
use crate::model::live::LiveModel;

/// Hydration progress for the current identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationPhase {
    /// No identity attached.
    Detached,
    /// Identity attached; snapshot not applied yet.
    Pending(DocumentId),
    /// Snapshot applied and baseline seeded.
    Hydrated(DocumentId),
}

/// Result of one `hydrate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrationOutcome {
    Seeded(Fingerprint),
    AlreadyHydrated,
}

#[derive(Debug)]
pub struct Hydrator {
    phase: HydrationPhase,
}

impl Default for Hydrator {
    fn default() -> Self {
        Self {
            phase: HydrationPhase::Detached,
        }
    }
}

impl Hydrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> HydrationPhase {
        self.phase
    }

    /// Attaches an identity without hydrating it yet.
    ///
    /// Re-attaching the identity already hydrated keeps the hydrated phase.
    pub fn attach(&mut self, document_id: DocumentId) {
        if self.phase != HydrationPhase::Hydrated(document_id) {
            self.phase = HydrationPhase::Pending(document_id);
        }
    }

    pub fn is_hydrated(&self) -> bool {
        matches!(self.phase, HydrationPhase::Hydrated(_))
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        match self.phase {
            HydrationPhase::Detached => None,
            HydrationPhase::Pending(id) | HydrationPhase::Hydrated(id) => Some(id),
        }
    }

    /// Loads `loaded` into `model` (nothing to load when `None`) and seeds
    /// the baseline with the resulting model fingerprint.
    pub fn hydrate<M: LiveModel + ?Sized>(
        &mut self,
        document_id: DocumentId,
        loaded: Option<&DocumentSnapshot>,
        model: &mut M,
        tracker: &DirtyTracker,
        baselines: &mut BaselineStore,
    ) -> HydrationOutcome {
        if self.phase == HydrationPhase::Hydrated(document_id) {
            return HydrationOutcome::AlreadyHydrated;
        }

        self.phase = HydrationPhase::Pending(document_id);
        if let Some(snapshot) = loaded {
            model.load_snapshot(snapshot);
        }
        let fingerprint = tracker.fingerprint(&model.snapshot());
        baselines.seed(document_id, fingerprint.clone());
        self.phase = HydrationPhase::Hydrated(document_id);
        HydrationOutcome::Seeded(fingerprint)
    }

    pub fn reset(&mut self) {
        self.phase = HydrationPhase::Detached;
    }
}

//! Autosave engine for one attached document.
//!
//! # Responsibility
//! - Compose hydrator, baseline store, dirty tracker and save scheduler into
//!   one instance-scoped state object.
//! - Translate mutation, timer and gateway events into scheduler transitions.
//!
//! # Invariants
//! - All transitions are synchronous; the caller supplies the clock.
//! - Before hydration completes every event is ignored.
//! - The baseline moves only when the in-flight attempt of the current epoch
//!   resolves successfully.
//! - Attaching a new identity bumps the epoch and drops timer, attempt and
//!   baseline state.

use crate::autosave::baseline::{Baseline, BaselineStore};
use crate::autosave::config::AutosaveConfig;
use crate::autosave::fingerprint::Fingerprint;
use crate::autosave::gateway::PersistError;
use crate::autosave::hydrator::{HydrationOutcome, HydrationPhase, Hydrator};
use crate::autosave::scheduler::{Resolution, SaveScheduler, SchedulerState};
use crate::autosave::status::SaveStatus;
use crate::autosave::tracker::DirtyTracker;
use crate::model::document::{DocumentId, DocumentSnapshot};
use crate::model::live::LiveModel;
use log::{debug, info, warn};
use serde_json::Value;
use tokio::time::Instant;

/// One persistence call handed to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveAttempt {
    /// Engine attach generation the attempt was issued under.
    pub epoch: u64,
    /// Scheduler sequence within the engine.
    pub sequence: u64,
    pub document_id: DocumentId,
    /// Exact state being persisted.
    pub snapshot: DocumentSnapshot,
    pub fingerprint: Fingerprint,
}

impl SaveAttempt {
    /// Normalized title sent to the gateway.
    pub fn title(&self) -> &str {
        self.snapshot.normalized_title()
    }

    pub fn content(&self) -> &Value {
        &self.snapshot.content
    }
}

/// Effect of one mutation notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Engine not hydrated; notification dropped.
    Ignored,
    /// Live model matches the baseline.
    Clean,
    /// Debounce timer (re)armed.
    Armed { deadline: Instant },
    /// A save is in flight; a follow-up save is owed.
    PendingIntent,
}

#[derive(Debug)]
pub struct AutosaveEngine {
    config: AutosaveConfig,
    epoch: u64,
    hydrator: Hydrator,
    baselines: BaselineStore,
    tracker: DirtyTracker,
    scheduler: SaveScheduler,
}

impl AutosaveEngine {
    pub fn new(config: AutosaveConfig) -> Self {
        let tracker = DirtyTracker::new(config.canonicalizer());
        let scheduler = SaveScheduler::new(config.debounce);
        Self {
            config,
            epoch: 0,
            hydrator: Hydrator::new(),
            baselines: BaselineStore::new(),
            tracker,
            scheduler,
        }
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.hydrator.document_id()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrator.is_hydrated()
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baselines.get()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn status(&self) -> SaveStatus {
        self.scheduler.status()
    }

    /// Deadline the host timer should fire at, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        if self.hydrator.is_hydrated() {
            self.scheduler.deadline()
        } else {
            None
        }
    }

    pub fn fingerprint(&self, snapshot: &DocumentSnapshot) -> Fingerprint {
        self.tracker.fingerprint(snapshot)
    }

    pub fn is_dirty<M: LiveModel + ?Sized>(&self, model: &M) -> bool {
        self.tracker.is_dirty(&model.snapshot(), self.baselines.get())
    }

    /// Attaches `document_id`, keeping the current config.
    ///
    /// Attaching the identity already attached is a no-op. Returns the epoch.
    pub fn attach(&mut self, document_id: DocumentId) -> u64 {
        if self.document_id() == Some(document_id) {
            return self.epoch;
        }
        self.begin_epoch(document_id);
        self.epoch
    }

    /// Attaches `document_id` with a new config (e.g. a different document kind).
    pub fn attach_with(&mut self, document_id: DocumentId, config: AutosaveConfig) -> u64 {
        if self.document_id() == Some(document_id) && self.config == config {
            return self.epoch;
        }
        self.tracker = DirtyTracker::new(config.canonicalizer());
        self.scheduler = SaveScheduler::new(config.debounce);
        self.config = config;
        self.begin_epoch(document_id);
        self.epoch
    }

    /// Loads the persisted snapshot into `model` and seeds the baseline.
    ///
    /// Attaches `document_id` first when it differs from the current identity.
    pub fn hydrate<M: LiveModel + ?Sized>(
        &mut self,
        document_id: DocumentId,
        loaded: Option<&DocumentSnapshot>,
        model: &mut M,
    ) -> HydrationOutcome {
        self.attach(document_id);
        let outcome = self.hydrator.hydrate(
            document_id,
            loaded,
            model,
            &self.tracker,
            &mut self.baselines,
        );
        if let HydrationOutcome::Seeded(fingerprint) = &outcome {
            info!(
                "event=autosave_hydrate module=autosave status=ok document_id={} epoch={} loaded={} fingerprint={}",
                document_id,
                self.epoch,
                loaded.is_some(),
                fingerprint.short()
            );
        }
        outcome
    }

    /// Handles "the live model changed".
    pub fn on_mutation<M: LiveModel + ?Sized>(&mut self, model: &M, now: Instant) -> MutationOutcome {
        if !self.hydrator.is_hydrated() {
            return MutationOutcome::Ignored;
        }

        let dirty = self.is_dirty(model);
        self.scheduler.on_mutation(dirty, now);
        match self.scheduler.state() {
            SchedulerState::Idle => MutationOutcome::Clean,
            SchedulerState::Armed { deadline } => MutationOutcome::Armed { deadline },
            SchedulerState::Saving { .. } | SchedulerState::SavingWithPendingIntent { .. } => {
                MutationOutcome::PendingIntent
            }
        }
    }

    /// Handles the debounce timer. Returns the attempt to hand to the gateway.
    pub fn on_timer<M: LiveModel + ?Sized>(
        &mut self,
        model: &M,
        now: Instant,
    ) -> Option<SaveAttempt> {
        let document_id = match self.hydrator.phase() {
            HydrationPhase::Hydrated(id) => id,
            _ => return None,
        };

        let snapshot = model.snapshot();
        let fingerprint = self.tracker.fingerprint(&snapshot);
        let dirty = self
            .baselines
            .get()
            .map_or(true, |baseline| baseline.fingerprint != fingerprint);

        let sequence = self.scheduler.on_timer(dirty, now)?;
        debug!(
            "event=autosave_fire module=autosave status=start document_id={} epoch={} attempt={} fingerprint={}",
            document_id,
            self.epoch,
            sequence,
            fingerprint.short()
        );
        Some(SaveAttempt {
            epoch: self.epoch,
            sequence,
            document_id,
            snapshot,
            fingerprint,
        })
    }

    /// Applies a gateway result.
    ///
    /// Results for another epoch, identity or sequence are discarded.
    pub fn on_save_resolved<M: LiveModel + ?Sized>(
        &mut self,
        attempt: &SaveAttempt,
        result: Result<(), PersistError>,
        model: &M,
        now: Instant,
    ) -> Resolution {
        let current = attempt.epoch == self.epoch
            && self.document_id() == Some(attempt.document_id)
            && self.scheduler.in_flight() == Some(attempt.sequence);
        if !current {
            debug!(
                "event=autosave_resolve module=autosave status=stale document_id={} epoch={} attempt={} current_epoch={}",
                attempt.document_id, attempt.epoch, attempt.sequence, self.epoch
            );
            return Resolution::Stale;
        }

        let succeeded = match &result {
            Ok(()) => {
                self.baselines
                    .commit(attempt.document_id, attempt.fingerprint.clone());
                true
            }
            Err(err) => {
                warn!(
                    "event=autosave_resolve module=autosave status=error document_id={} attempt={} error={}",
                    attempt.document_id, attempt.sequence, err
                );
                false
            }
        };

        let tracker = &self.tracker;
        let baselines = &self.baselines;
        let resolution = self.scheduler.on_resolved(
            attempt.sequence,
            succeeded,
            || tracker.is_dirty(&model.snapshot(), baselines.get()),
            now,
        );
        if succeeded {
            info!(
                "event=autosave_resolve module=autosave status=ok document_id={} attempt={} fingerprint={} rearmed={}",
                attempt.document_id,
                attempt.sequence,
                attempt.fingerprint.short(),
                matches!(resolution, Resolution::SavedAndRearmed { .. })
            );
        }
        resolution
    }

    /// User-triggered retry. Returns `true` when a save is now scheduled.
    pub fn retry<M: LiveModel + ?Sized>(&mut self, model: &M, now: Instant) -> bool {
        if !self.hydrator.is_hydrated() {
            return false;
        }
        let dirty = self.is_dirty(model);
        self.scheduler.retry(dirty, now)
    }

    /// Drops all state. Late gateway results become stale.
    pub fn detach(&mut self) {
        if let Some(document_id) = self.document_id() {
            info!(
                "event=autosave_detach module=autosave status=ok document_id={} epoch={}",
                document_id, self.epoch
            );
        }
        self.epoch += 1;
        self.scheduler.reset();
        self.baselines.clear();
        self.hydrator.reset();
    }

    fn begin_epoch(&mut self, document_id: DocumentId) {
        self.epoch += 1;
        self.scheduler.reset();
        self.baselines.clear();
        // The baseline is gone, so even the same identity must hydrate again.
        self.hydrator.reset();
        self.hydrator.attach(document_id);
        debug!(
            "event=autosave_attach module=autosave status=ok document_id={} epoch={} kind={}",
            document_id,
            self.epoch,
            self.config.kind.as_str()
        );
    }
}

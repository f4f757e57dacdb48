//! Debounced single-slot save scheduler.
//!
//! # Responsibility
//! - Coalesce mutation bursts into one save per quiescence window.
//! - Keep at most one save in flight and remember edits made meanwhile.
//!
//! # Invariants
//! - `Saving*` states hold exactly one attempt sequence; no second attempt
//!   starts until that sequence resolves.
//! - A resolution whose sequence is not the in-flight one is stale and changes
//!   nothing.
//! - Failure never arms a timer on its own; only a mutation or `retry` does.
//!
//! The scheduler only sees dirtiness booleans and clock instants; baseline
//! bookkeeping lives in the engine.

use crate::autosave::status::SaveStatus;
use std::time::Duration;
use tokio::time::Instant;

/// Scheduler state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed { deadline: Instant },
    Saving { attempt: u64 },
    SavingWithPendingIntent { attempt: u64 },
}

/// How a gateway resolution was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Saved; nothing newer to persist.
    Saved,
    /// Saved; edits made during the call re-armed the timer.
    SavedAndRearmed { deadline: Instant },
    /// Gateway rejected; baseline must stay untouched.
    Failed,
    /// Not the in-flight attempt; ignored.
    Stale,
}

#[derive(Debug)]
pub struct SaveScheduler {
    debounce: Duration,
    state: SchedulerState,
    pending_intent: bool,
    last_attempt_failed: bool,
    next_attempt: u64,
}

impl SaveScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: SchedulerState::Idle,
            pending_intent: false,
            last_attempt_failed: false,
            next_attempt: 1,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pending_intent(&self) -> bool {
        self.pending_intent
    }

    pub fn status(&self) -> SaveStatus {
        SaveStatus::project(&self.state, self.last_attempt_failed)
    }

    /// Deadline of the armed timer, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// In-flight attempt sequence, if any.
    pub fn in_flight(&self) -> Option<u64> {
        match self.state {
            SchedulerState::Saving { attempt }
            | SchedulerState::SavingWithPendingIntent { attempt } => Some(attempt),
            _ => None,
        }
    }

    /// Applies one mutation notification.
    pub fn on_mutation(&mut self, dirty: bool, now: Instant) {
        match self.state {
            SchedulerState::Idle if dirty => {
                self.state = SchedulerState::Armed {
                    deadline: now + self.debounce,
                };
            }
            SchedulerState::Idle => {
                // Back at the baseline: nothing left unsaved, so an old failure is moot.
                self.pending_intent = false;
                self.last_attempt_failed = false;
            }
            SchedulerState::Armed { .. } => {
                self.state = SchedulerState::Armed {
                    deadline: now + self.debounce,
                };
            }
            SchedulerState::Saving { attempt } => {
                self.pending_intent = true;
                self.state = SchedulerState::SavingWithPendingIntent { attempt };
            }
            SchedulerState::SavingWithPendingIntent { .. } => {
                self.pending_intent = true;
            }
        }
    }

    /// Fires the armed timer when its deadline has passed.
    ///
    /// Returns the new attempt sequence when a save must start. A clean model
    /// at fire time goes back to idle without an attempt.
    pub fn on_timer(&mut self, dirty: bool, now: Instant) -> Option<u64> {
        let SchedulerState::Armed { deadline } = self.state else {
            return None;
        };
        if now < deadline {
            return None;
        }

        if !dirty {
            self.state = SchedulerState::Idle;
            self.pending_intent = false;
            self.last_attempt_failed = false;
            return None;
        }

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.pending_intent = false;
        self.state = SchedulerState::Saving { attempt };
        Some(attempt)
    }

    /// Applies the gateway result for `attempt`.
    ///
    /// `dirty_after` is evaluated only when edits arrived during the call and
    /// the save succeeded; it must compare against the updated baseline.
    pub fn on_resolved(
        &mut self,
        attempt: u64,
        succeeded: bool,
        dirty_after: impl FnOnce() -> bool,
        now: Instant,
    ) -> Resolution {
        let had_pending = match self.state {
            SchedulerState::Saving { attempt: current } if current == attempt => false,
            SchedulerState::SavingWithPendingIntent { attempt: current } if current == attempt => {
                true
            }
            _ => return Resolution::Stale,
        };

        if !succeeded {
            self.state = SchedulerState::Idle;
            self.last_attempt_failed = true;
            return Resolution::Failed;
        }

        self.last_attempt_failed = false;
        self.pending_intent = false;
        if had_pending && dirty_after() {
            let deadline = now + self.debounce;
            self.state = SchedulerState::Armed { deadline };
            return Resolution::SavedAndRearmed { deadline };
        }

        self.state = SchedulerState::Idle;
        Resolution::Saved
    }

    /// Manual retry: arms an immediate deadline when something is unsaved.
    ///
    /// Returns `true` when a timer is now armed.
    pub fn retry(&mut self, dirty: bool, now: Instant) -> bool {
        match self.state {
            SchedulerState::Idle if dirty || self.pending_intent => {
                self.state = SchedulerState::Armed { deadline: now };
                true
            }
            SchedulerState::Armed { .. } => {
                self.state = SchedulerState::Armed { deadline: now };
                true
            }
            _ => false,
        }
    }

    /// Drops timer, attempt bookkeeping and flags.
    pub fn reset(&mut self) {
        self.state = SchedulerState::Idle;
        self.pending_intent = false;
        self.last_attempt_failed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{Resolution, SaveScheduler, SchedulerState};
    use crate::autosave::status::SaveStatus;
    use std::time::Duration;
    use tokio::time::Instant;

    const DEBOUNCE: Duration = Duration::from_millis(1000);

    #[test]
    fn burst_of_mutations_rearms_single_deadline() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        let start = Instant::now();
        for step in 0..5 {
            scheduler.on_mutation(true, start + Duration::from_millis(step * 100));
        }
        assert_eq!(
            scheduler.deadline(),
            Some(start + Duration::from_millis(400) + DEBOUNCE)
        );
        assert_eq!(scheduler.on_timer(true, start + DEBOUNCE), None);
        assert_eq!(
            scheduler.on_timer(true, start + Duration::from_millis(1400)),
            Some(1)
        );
        assert_eq!(scheduler.status(), SaveStatus::Saving);
    }

    #[test]
    fn clean_mutation_does_not_arm() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        scheduler.on_mutation(false, Instant::now());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.status(), SaveStatus::Clean);
    }

    #[test]
    fn timer_on_clean_model_skips_the_save() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        let now = Instant::now();
        scheduler.on_mutation(true, now);
        assert_eq!(scheduler.on_timer(false, now + DEBOUNCE), None);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn mutation_while_saving_records_pending_intent_without_new_attempt() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        let now = Instant::now();
        scheduler.on_mutation(true, now);
        let attempt = scheduler.on_timer(true, now + DEBOUNCE).unwrap();

        scheduler.on_mutation(true, now + DEBOUNCE);
        assert_eq!(
            scheduler.state(),
            SchedulerState::SavingWithPendingIntent { attempt }
        );
        assert_eq!(scheduler.deadline(), None);
        assert_eq!(scheduler.on_timer(true, now + DEBOUNCE * 5), None);

        let resolved_at = now + DEBOUNCE * 2;
        let resolution = scheduler.on_resolved(attempt, true, || true, resolved_at);
        assert_eq!(
            resolution,
            Resolution::SavedAndRearmed {
                deadline: resolved_at + DEBOUNCE
            }
        );
        assert_eq!(scheduler.status(), SaveStatus::Dirty);
    }

    #[test]
    fn pending_intent_that_reverted_goes_idle() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        let now = Instant::now();
        scheduler.on_mutation(true, now);
        let attempt = scheduler.on_timer(true, now + DEBOUNCE).unwrap();
        scheduler.on_mutation(true, now + DEBOUNCE);
        assert_eq!(
            scheduler.on_resolved(attempt, true, || false, now + DEBOUNCE),
            Resolution::Saved
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn failure_keeps_pending_intent_and_waits_for_next_trigger() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        let now = Instant::now();
        scheduler.on_mutation(true, now);
        let attempt = scheduler.on_timer(true, now + DEBOUNCE).unwrap();
        scheduler.on_mutation(true, now + DEBOUNCE);

        let resolution = scheduler.on_resolved(attempt, false, || false, now + DEBOUNCE);
        assert_eq!(resolution, Resolution::Failed);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.pending_intent());
        assert_eq!(scheduler.status(), SaveStatus::Error);
        assert_eq!(scheduler.deadline(), None);

        scheduler.on_mutation(true, now + DEBOUNCE * 3);
        assert!(scheduler.deadline().is_some());
        assert_eq!(scheduler.status(), SaveStatus::Error);
    }

    #[test]
    fn error_outranks_armed_until_attempt_or_revert() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        let now = Instant::now();
        scheduler.on_mutation(true, now);
        let attempt = scheduler.on_timer(true, now + DEBOUNCE).unwrap();
        scheduler.on_resolved(attempt, false, || false, now + DEBOUNCE);

        let edited_at = now + DEBOUNCE * 2;
        scheduler.on_mutation(true, edited_at);
        assert!(matches!(scheduler.state(), SchedulerState::Armed { .. }));
        assert_eq!(scheduler.status().label(), "Couldn't save");

        // Edits reverted before the timer: error clears without a new attempt.
        assert_eq!(scheduler.on_timer(false, edited_at + DEBOUNCE), None);
        assert_eq!(scheduler.status(), SaveStatus::Clean);

        scheduler.on_mutation(true, edited_at + DEBOUNCE);
        assert_eq!(scheduler.status(), SaveStatus::Dirty);
        assert_eq!(scheduler.status().label(), "Saved");
    }

    #[test]
    fn stale_resolution_is_ignored() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        let now = Instant::now();
        scheduler.on_mutation(true, now);
        let attempt = scheduler.on_timer(true, now + DEBOUNCE).unwrap();

        assert_eq!(
            scheduler.on_resolved(attempt + 1, true, || true, now),
            Resolution::Stale
        );
        assert_eq!(scheduler.in_flight(), Some(attempt));

        scheduler.reset();
        assert_eq!(
            scheduler.on_resolved(attempt, true, || true, now),
            Resolution::Stale
        );
    }

    #[test]
    fn retry_arms_immediately_after_failure() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        let now = Instant::now();
        scheduler.on_mutation(true, now);
        let attempt = scheduler.on_timer(true, now + DEBOUNCE).unwrap();
        scheduler.on_resolved(attempt, false, || false, now + DEBOUNCE);

        let later = now + DEBOUNCE * 4;
        assert!(scheduler.retry(true, later));
        assert_eq!(scheduler.deadline(), Some(later));
        assert_eq!(scheduler.on_timer(true, later), Some(attempt + 1));
    }

    #[test]
    fn retry_with_nothing_unsaved_is_noop() {
        let mut scheduler = SaveScheduler::new(DEBOUNCE);
        assert!(!scheduler.retry(false, Instant::now()));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}

//! User-facing save status projected from scheduler state.

use crate::autosave::scheduler::SchedulerState;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Save status shown next to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    /// Live model matches the persisted baseline.
    Clean,
    /// Unsaved edits waiting for the quiescence window.
    Dirty,
    /// A gateway call is in flight.
    Saving,
    /// The last gateway call failed and nothing newer has been attempted.
    Error,
}

impl SaveStatus {
    /// Projects scheduler state.
    ///
    /// A failure outranks `Armed`: edits made after a rejected save read as
    /// `Error` until the next attempt starts or the model returns to its
    /// baseline. A plain `Armed` state maps to `Dirty`, which still renders as
    /// "Saved".
    pub fn project(state: &SchedulerState, last_attempt_failed: bool) -> Self {
        match state {
            SchedulerState::Saving { .. } | SchedulerState::SavingWithPendingIntent { .. } => {
                Self::Saving
            }
            _ if last_attempt_failed => Self::Error,
            SchedulerState::Armed { .. } => Self::Dirty,
            SchedulerState::Idle => Self::Clean,
        }
    }

    /// Label rendered by the UI. Pending edits still read as saved.
    pub fn label(self) -> &'static str {
        match self {
            Self::Clean | Self::Dirty => "Saved",
            Self::Saving => "Saving…",
            Self::Error => "Couldn't save",
        }
    }
}

impl Display for SaveStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

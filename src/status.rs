//! # Crossing Status Engine
//!
//! Maps the classified tide level to a crossing status and tells the caller
//! when a transition deserves side effects.
//!
//! | Tide level | Status | Interruption |
//! |---|---|---|
//! | High | Caution | HighTide |
//! | Low | Caution | LowTide |
//! | Intermediate | Normal | none |
//!
//! Side effects (history entry, notification, sound) fire only when the
//! decided status differs from the held one and the new status is not
//! `Normal`. Going back to normal is silent. High straight to Low keeps the
//! status at `Caution` and so fires nothing.

use crate::{CrossingStatus, HistoryEntry, InterruptionType, TideLevel};
use chrono::NaiveDateTime;

pub const HIGH_TIDE_REASON: &str = "High tide: disembark at quay stairway";
pub const LOW_TIDE_REASON: &str = "Low tide: disembark at quay stairway";
pub const NORMAL_REASON: &str = "Normal operation: disembark at market basin";

/// Outcome of [`decide`] for one tide level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub status: CrossingStatus,
    pub reason: &'static str,
    pub interruption: Option<InterruptionType>,
}

/// Pure mapping from tide level to status, reason and interruption type.
pub fn decide(level: TideLevel) -> Decision {
    match level {
        TideLevel::High => Decision {
            status: CrossingStatus::Caution,
            reason: HIGH_TIDE_REASON,
            interruption: Some(InterruptionType::HighTide),
        },
        TideLevel::Low => Decision {
            status: CrossingStatus::Caution,
            reason: LOW_TIDE_REASON,
            interruption: Some(InterruptionType::LowTide),
        },
        TideLevel::Intermediate => Decision {
            status: CrossingStatus::Normal,
            reason: NORMAL_REASON,
            interruption: None,
        },
    }
}

/// What one evaluation did to the held status.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub previous: CrossingStatus,
    pub decision: Decision,
    /// Present only for a genuine transition into a non-normal status
    pub alert: Option<HistoryEntry>,
}

impl Evaluation {
    pub fn changed(&self) -> bool {
        self.previous != self.decision.status
    }
}

/// Holder of the current crossing status.
#[derive(Clone, Debug, Default)]
pub struct StatusEngine {
    status: CrossingStatus,
}

impl StatusEngine {
    pub fn new(status: CrossingStatus) -> Self {
        Self { status }
    }

    pub fn status(&self) -> CrossingStatus {
        self.status
    }

    /// Apply `level` observed at `now` and report whether an alert is due.
    pub fn evaluate(&mut self, level: TideLevel, now: NaiveDateTime) -> Evaluation {
        let decision = decide(level);
        let previous = self.status;

        let alert = match decision.interruption {
            Some(interruption_type) if decision.status != previous => Some(HistoryEntry {
                timestamp: now,
                reason: decision.reason.to_string(),
                interruption_type,
            }),
            _ => None,
        };

        self.status = decision.status;

        Evaluation {
            previous,
            decision,
            alert,
        }
    }
}

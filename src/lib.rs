//! # Catraia Alert Core Library
//!
//! This library holds the data model and the evaluation pipeline behind the
//! catraia (small passenger ferry) crossing dashboard between Santos and
//! Vicente de Carvalho. The crossing lands passengers at the floating dock in
//! the market basin under normal conditions, and at the quay stairway when the
//! tide is too high or too low for the dock.
//!
//! ## Data Flow
//!
//! 1. **Startup**: the [`forecast`] provider produces three days of tide events
//! 2. **Every tick** (60 s by default): the [`classifier`] interpolates the
//!    current tide height from today's events and buckets it
//! 3. **Status**: the [`status`] engine maps the tide level to a crossing
//!    status and reports whether a genuine transition happened
//! 4. **Side effects**: on a transition into a non-normal status the
//!    [`controller`] appends to the [`history`] log and fires the [`alerts`]
//! 5. **Presentation**: the [`renderer`] draws a read-only
//!    [`controller::DashboardView`]
//!
//! ## Core Types
//!
//! - [`TideEvent`]: a single high or low tide extremum
//! - [`DailyForecast`]: the four events of one calendar day
//! - [`TideLevel`]: derived classification of the current height
//! - [`CrossingStatus`]: the state held by the status engine
//! - [`HistoryEntry`]: an immutable record of a status transition

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod alerts;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod forecast;
pub mod history;
pub mod quay_map;
pub mod renderer;
pub mod status;
pub mod storage;

/// Kind of tide extremum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideKind {
    High,
    Low,
}

impl TideKind {
    /// The other kind. Consecutive events of a day alternate.
    pub fn opposite(self) -> Self {
        match self {
            TideKind::High => TideKind::Low,
            TideKind::Low => TideKind::High,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TideKind::High => "high",
            TideKind::Low => "low",
        }
    }
}

/// A single tide extremum.
///
/// Instants are local wall-clock times: the forecast is generated per
/// calendar day and compared against the local clock, so no timezone is
/// carried around.
///
/// # Example
/// ```
/// use catraia_lib::{TideEvent, TideKind};
/// use chrono::NaiveDate;
///
/// let instant = NaiveDate::from_ymd_opt(2025, 3, 14)
///     .unwrap()
///     .and_hms_opt(6, 12, 0)
///     .unwrap();
/// let event = TideEvent { kind: TideKind::High, instant, height_meters: 1.3 };
/// assert_eq!(event.kind.opposite(), TideKind::Low);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    pub kind: TideKind,
    pub instant: NaiveDateTime,
    /// Height above chart datum in meters, never negative
    pub height_meters: f64,
}

/// One calendar day's tide events.
///
/// `events` holds exactly four entries sorted by instant with alternating
/// kinds. A forecast is never mutated once built, only replaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub events: Vec<TideEvent>,
}

impl DailyForecast {
    /// Display date, e.g. `18 October`.
    pub fn display_date(&self) -> String {
        self.date.format("%-d %B").to_string()
    }

    /// Full weekday name, e.g. `Saturday`.
    pub fn weekday(&self) -> String {
        self.date.format("%A").to_string()
    }
}

/// Classification of the current tide height.
///
/// Derived on every tick and never authoritative; only the last computed
/// value is persisted as a convenience.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideLevel {
    High,
    Low,
    #[default]
    Intermediate,
}

impl TideLevel {
    /// True for the levels that send passengers to the quay stairway.
    pub fn is_extreme(self) -> bool {
        matches!(self, TideLevel::High | TideLevel::Low)
    }
}

impl fmt::Display for TideLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TideLevel::High => "High tide",
            TideLevel::Low => "Low tide",
            TideLevel::Intermediate => "Intermediate tide",
        };
        f.write_str(text)
    }
}

/// Crossing status, owned by [`status::StatusEngine`].
///
/// Tide alone only moves between `Normal` and `Caution`. `Halted` is
/// reserved for ship movements reported by an outside collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossingStatus {
    #[default]
    Normal,
    Caution,
    Halted,
}

impl fmt::Display for CrossingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CrossingStatus::Normal => "Normal",
            CrossingStatus::Caution => "Caution: quay stairway",
            CrossingStatus::Halted => "Halted",
        };
        f.write_str(text)
    }
}

/// Why the crossing left normal operation.
///
/// Only the two tide variants are produced here; the ship variants belong
/// to ship tracking around berth 15.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionType {
    HighTide,
    LowTide,
    ShipPassing,
    ShipDocked,
    ShipEntering,
    ShipLeaving,
    ShipManeuvering,
}

impl InterruptionType {
    /// Short badge text shown next to a history entry.
    pub fn badge(self) -> &'static str {
        match self {
            InterruptionType::HighTide => "High tide",
            InterruptionType::LowTide => "Low tide",
            InterruptionType::ShipPassing => "Ship",
            InterruptionType::ShipDocked => "Berth 15",
            InterruptionType::ShipEntering => "Entering",
            InterruptionType::ShipLeaving => "Leaving",
            InterruptionType::ShipManeuvering => "Maneuver",
        }
    }

    pub fn is_tide(self) -> bool {
        matches!(self, InterruptionType::HighTide | InterruptionType::LowTide)
    }
}

/// Immutable record of a transition out of normal operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: NaiveDateTime,
    pub reason: String,
    pub interruption_type: InterruptionType,
}

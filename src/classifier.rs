//! # Tide Classifier
//!
//! Estimates the current tide height between two extrema and buckets it
//! against the two landing thresholds.
//!
//! ## Interpolation
//!
//! Between the previous extremum `prev` and the next one `next` the height
//! follows a half-cosine ease:
//!
//! ```text
//! progress = (now - prev.instant) / (next.instant - prev.instant)
//! height   = prev.h + (next.h - prev.h) * (1 - cos(progress * π)) / 2
//! ```
//!
//! The curve is flat at both extrema and steepest halfway, which is how real
//! tides accelerate and slow down. It is continuous at every event instant.
//!
//! ## Outside the Day's Events
//!
//! The day is treated as cyclic: before the first event `prev` is the last
//! event, after the last event `next` is the first one. Both cases produce a
//! non-positive span and the level is read from `prev` directly. `progress`
//! is clamped to `[0, 1]` so the easing can never overshoot an extremum.

use crate::{TideEvent, TideKind, TideLevel};
use chrono::NaiveDateTime;
use std::f64::consts::PI;

/// Interpolated heights at or above this are [`TideLevel::High`].
pub const HIGH_TIDE_THRESHOLD_M: f64 = 1.15;

/// Interpolated heights at or below this are [`TideLevel::Low`].
pub const LOW_TIDE_THRESHOLD_M: f64 = 0.46;

/// Classify the tide at `now` from today's ordered events.
///
/// An empty day yields [`TideLevel::Intermediate`].
pub fn classify(events: &[TideEvent], now: NaiveDateTime) -> TideLevel {
    interpolate_height(events, now)
        .map(classify_height)
        .unwrap_or(TideLevel::Intermediate)
}

/// Bucket a height against the thresholds. Both bounds are inclusive.
pub fn classify_height(height_meters: f64) -> TideLevel {
    if height_meters >= HIGH_TIDE_THRESHOLD_M {
        TideLevel::High
    } else if height_meters <= LOW_TIDE_THRESHOLD_M {
        TideLevel::Low
    } else {
        TideLevel::Intermediate
    }
}

/// Estimated height at `now`, or `None` when there are no events.
pub fn interpolate_height(events: &[TideEvent], now: NaiveDateTime) -> Option<f64> {
    let (prev, next) = bracket(events, now)?;

    let span = (next.instant - prev.instant).num_milliseconds();
    if span <= 0 {
        return Some(prev.height_meters);
    }

    let elapsed = (now - prev.instant).num_milliseconds();
    let progress = (elapsed as f64 / span as f64).clamp(0.0, 1.0);
    let ease = (1.0 - (progress * PI).cos()) / 2.0;

    Some(prev.height_meters + (next.height_meters - prev.height_meters) * ease)
}

/// Direction the water is moving in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TideTrend {
    /// Falling, after a high tide
    Ebbing,
    /// Rising, after a low tide
    Flooding,
}

/// Short description of where the tide is heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TideOutlook {
    pub trend: TideTrend,
    pub next: TideEvent,
}

impl TideOutlook {
    /// e.g. `Ebbing - next low at 12:24`
    pub fn summary(&self) -> String {
        let trend = match self.trend {
            TideTrend::Ebbing => "Ebbing",
            TideTrend::Flooding => "Flooding",
        };
        format!(
            "{trend} - next {} at {}",
            self.next.kind.label(),
            self.next.instant.format("%H:%M")
        )
    }
}

/// Trend and upcoming extremum at `now`, using the same cyclic bracketing as
/// [`classify`].
pub fn outlook(events: &[TideEvent], now: NaiveDateTime) -> Option<TideOutlook> {
    let (prev, next) = bracket(events, now)?;
    let trend = match prev.kind {
        TideKind::High => TideTrend::Ebbing,
        TideKind::Low => TideTrend::Flooding,
    };
    Some(TideOutlook { trend, next: *next })
}

/// Previous event (last with `instant <= now`, else the day's last) and next
/// event (first with `instant > now`, else the day's first).
fn bracket(events: &[TideEvent], now: NaiveDateTime) -> Option<(&TideEvent, &TideEvent)> {
    let first = events.first()?;
    let last = events.last()?;

    let prev = events.iter().rev().find(|e| e.instant <= now).unwrap_or(last);
    let next = events.iter().find(|e| e.instant > now).unwrap_or(first);

    Some((prev, next))
}

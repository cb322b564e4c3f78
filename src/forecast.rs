//! # Tide Forecast Provider
//!
//! The dashboard needs, for today and the next two days, the four tide
//! extrema of each day. This module defines the [`ForecastProvider`] seam and
//! ships [`SimulatedForecast`], a deterministic stand-in that a real tidal
//! prediction feed can replace without touching the classifier or the status
//! engine.
//!
//! ## Simulated Model
//!
//! Each day is a pure function of its calendar date:
//! - **Seed**: `year * 10000 + month * 100 + day`
//! - **Generator**: SplitMix64, one independent draw per purpose (see [`unit_draw`])
//! - **Phase**: first event 3 to 7 hours past midnight
//! - **Spacing**: 372 minutes (6.2 hours) between events
//! - **Heights**: high tides in [1.0, 1.5] m, low tides in [0.1, 0.5] m,
//!   rounded to centimeters
//!
//! Offsets past midnight wrap into the early hours of the same day and the
//! events are sorted afterwards. Four is even, so a rotated alternating
//! sequence still alternates.

use crate::{DailyForecast, TideEvent, TideKind};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::future::Future;
use thiserror::Error;

/// Days covered by one forecast, starting with the reference day.
pub const FORECAST_DAYS: usize = 3;

/// Tide extrema per calendar day.
pub const EVENTS_PER_DAY: usize = 4;

/// Minutes between consecutive extrema (6.2 hours).
const EVENT_SPACING_MINUTES: i64 = 372;

const MINUTES_PER_DAY: i64 = 24 * 60;

// Draw indices. Heights use HEIGHT_DRAW + event index.
const PHASE_DRAW: u64 = 0;
const KIND_DRAW: u64 = 1;
const HEIGHT_DRAW: u64 = 2;

/// Errors a forecast source can report.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// The source could not be reached or answered with an error
    #[error("forecast source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with data that breaks the daily event invariants
    #[error("malformed forecast for {date}: {problem}")]
    Malformed { date: NaiveDate, problem: String },
}

/// Source of multi-day tide forecasts.
pub trait ForecastProvider {
    /// Forecast for [`FORECAST_DAYS`] days starting at the calendar day
    /// containing `reference`.
    fn forecast(
        &self,
        reference: NaiveDateTime,
    ) -> impl Future<Output = Result<Vec<DailyForecast>, ForecastError>> + Send;
}

/// Deterministic date-seeded forecast.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedForecast;

impl ForecastProvider for SimulatedForecast {
    async fn forecast(&self, reference: NaiveDateTime) -> Result<Vec<DailyForecast>, ForecastError> {
        Ok(simulate(reference.date()))
    }
}

/// Build the simulated forecast for [`FORECAST_DAYS`] days starting at `start`.
pub fn simulate(start: NaiveDate) -> Vec<DailyForecast> {
    start
        .iter_days()
        .take(FORECAST_DAYS)
        .map(simulate_day)
        .collect()
}

/// Build one simulated day.
pub fn simulate_day(date: NaiveDate) -> DailyForecast {
    let seed = day_seed(date);
    let midnight = date.and_time(chrono::NaiveTime::MIN);

    let start_minutes = ((3.0 + unit_draw(seed, PHASE_DRAW) * 4.0) * 60.0).floor() as i64;
    let start_kind = if unit_draw(seed, KIND_DRAW) > 0.5 {
        TideKind::High
    } else {
        TideKind::Low
    };

    let mut events: Vec<TideEvent> = (0..EVENTS_PER_DAY)
        .map(|j| {
            let kind = if j % 2 == 0 {
                start_kind
            } else {
                start_kind.opposite()
            };
            let offset = (start_minutes + j as i64 * EVENT_SPACING_MINUTES) % MINUTES_PER_DAY;
            let u = unit_draw(seed, HEIGHT_DRAW + j as u64);
            let height = match kind {
                TideKind::High => 1.0 + u * 0.5,
                TideKind::Low => 0.1 + u * 0.4,
            };
            TideEvent {
                kind,
                instant: midnight + Duration::minutes(offset),
                height_meters: round_cm(height),
            }
        })
        .collect();

    events.sort_by_key(|event| event.instant);

    DailyForecast { date, events }
}

/// Check the invariants a provider must honor for one day: exactly
/// [`EVENTS_PER_DAY`] events on that date, ascending, alternating, with
/// non-negative heights.
pub fn validate_day(day: &DailyForecast) -> Result<(), ForecastError> {
    let malformed = |problem: String| ForecastError::Malformed {
        date: day.date,
        problem,
    };

    if day.events.len() != EVENTS_PER_DAY {
        return Err(malformed(format!(
            "{} events, expected {EVENTS_PER_DAY}",
            day.events.len()
        )));
    }
    if let Some(event) = day.events.iter().find(|e| e.instant.date() != day.date) {
        return Err(malformed(format!("event at {} is on another day", event.instant)));
    }
    if let Some(event) = day
        .events
        .iter()
        .find(|e| !e.height_meters.is_finite() || e.height_meters < 0.0)
    {
        return Err(malformed(format!("invalid height {}", event.height_meters)));
    }
    for pair in day.events.windows(2) {
        if pair[0].instant >= pair[1].instant {
            return Err(malformed("events out of order".to_string()));
        }
        if pair[0].kind == pair[1].kind {
            return Err(malformed("consecutive events of the same kind".to_string()));
        }
    }
    Ok(())
}

/// Seed derived from the calendar date, e.g. 2025-03-14 → 20250314.
pub fn day_seed(date: NaiveDate) -> u64 {
    (date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64) as u64
}

/// Uniform value in `[0, 1)` for draw number `draw` of `seed`.
///
/// SplitMix64 applied to `seed + draw * 0x9E3779B97F4A7C15`, keeping the top
/// 53 bits as the mantissa. Integer-only until the final division, so every
/// port produces the same bits.
pub fn unit_draw(seed: u64, draw: u64) -> f64 {
    let bits = splitmix64(seed.wrapping_add(draw.wrapping_mul(GOLDEN_GAMMA)));
    (bits >> 11) as f64 / (1u64 << 53) as f64
}

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn round_cm(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

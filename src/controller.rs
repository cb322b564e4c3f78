//! # Dashboard Controller
//!
//! Single owner of the application state. Every change flows through here:
//!
//! 1. [`Controller::new`] seeds the state from the persisted snapshot
//! 2. [`Controller::load_forecast`] installs a validated forecast
//! 3. [`Controller::tick`] runs classifier → status engine → side effects →
//!    snapshot write, synchronously, for one instant
//! 4. [`Controller::view`] hands the presentation layer a read-only copy
//!
//! Ticks are no-ops until a forecast covering the current day is installed.
//! Notification, sound and snapshot failures are logged and never reach the
//! caller.

use crate::alerts::{AlertSound, Notifier, Permission, ALERT_TITLE};
use crate::classifier::{self, TideOutlook};
use crate::forecast::{self, ForecastError, ForecastProvider};
use crate::history::HistoryLog;
use crate::status::{self, Evaluation, StatusEngine};
use crate::storage::{self, KeyValueStore, PersistedSnapshot};
use crate::{CrossingStatus, DailyForecast, HistoryEntry, TideLevel};
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

/// Mutable state behind the dashboard.
#[derive(Clone, Debug, Default)]
struct AppState {
    engine: StatusEngine,
    tide_level: TideLevel,
    history: HistoryLog,
    forecast: Vec<DailyForecast>,
    outlook: Option<TideOutlook>,
    notifications_enabled: bool,
    sound_enabled: bool,
}

/// Result of one evaluation tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutcome {
    pub level: TideLevel,
    pub height_meters: Option<f64>,
    pub evaluation: Evaluation,
}

/// Read-only copy of everything the presentation layer draws.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardView {
    pub crossing_status: CrossingStatus,
    pub reason: &'static str,
    pub tide_level: TideLevel,
    pub outlook: Option<TideOutlook>,
    pub forecast: Vec<DailyForecast>,
    pub history: Vec<HistoryEntry>,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
}

pub struct Controller<S, N, A> {
    state: AppState,
    store: S,
    notifier: N,
    sound: A,
}

impl<S, N, A> Controller<S, N, A>
where
    S: KeyValueStore,
    N: Notifier,
    A: AlertSound,
{
    /// Build a controller and restore the last persisted snapshot, if any.
    pub fn new(store: S, notifier: N, sound: A) -> Self {
        let mut controller = Self {
            state: AppState::default(),
            store,
            notifier,
            sound,
        };
        controller.restore();
        controller
    }

    /// Reseed status, tide level and history from the stored snapshot.
    /// Falls back to Normal / Intermediate / empty when nothing usable is stored.
    pub fn restore(&mut self) {
        let snapshot = storage::load_snapshot(&self.store).unwrap_or_default();
        debug!(
            status = ?snapshot.crossing_status,
            level = ?snapshot.tide_level,
            "restored snapshot"
        );
        self.state.engine = StatusEngine::new(snapshot.crossing_status);
        self.state.tide_level = snapshot.tide_level;
        self.state.history = HistoryLog::from_entries(snapshot.history);
    }

    /// Fetch and install a forecast for the day containing `now`.
    ///
    /// On error the previous forecast (possibly none) is kept.
    pub async fn load_forecast<P: ForecastProvider>(
        &mut self,
        provider: &P,
        now: NaiveDateTime,
    ) -> Result<(), ForecastError> {
        let days = provider.forecast(now).await?;
        days.iter().try_for_each(forecast::validate_day)?;
        info!(days = days.len(), from = %now.date(), "tide forecast loaded");
        self.state.forecast = days;
        Ok(())
    }

    /// True when there is no forecast for the day containing `now`.
    pub fn needs_forecast(&self, now: NaiveDateTime) -> bool {
        self.state
            .forecast
            .first()
            .map_or(true, |day| day.date != now.date())
    }

    /// Run one evaluation at `now`. Returns `None` without forecast data.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<TickOutcome> {
        let today = self
            .state
            .forecast
            .iter()
            .find(|day| day.date == now.date())?;

        let height = classifier::interpolate_height(&today.events, now);
        let level = classifier::classify(&today.events, now);
        let outlook = classifier::outlook(&today.events, now);
        debug!(?height, ?level, "tide evaluated");

        let evaluation = self.state.engine.evaluate(level, now);
        self.state.tide_level = level;
        self.state.outlook = outlook;

        if evaluation.changed() {
            info!(
                from = %evaluation.previous,
                to = %evaluation.decision.status,
                reason = evaluation.decision.reason,
                "crossing status changed"
            );
        }
        if let Some(entry) = &evaluation.alert {
            self.state.history.append(entry.clone());
            self.fire_alerts(&entry.reason);
        }

        self.persist();

        Some(TickOutcome {
            level,
            height_meters: height,
            evaluation,
        })
    }

    /// Ask the notifier for permission; notifications follow the answer.
    pub fn enable_notifications(&mut self) -> Permission {
        let permission = self.notifier.request_permission();
        self.state.notifications_enabled = permission == Permission::Granted;
        info!(?permission, "notification permission");
        permission
    }

    /// Flip the sound alert switch and return the new value.
    pub fn toggle_sound(&mut self) -> bool {
        self.state.sound_enabled = !self.state.sound_enabled;
        self.state.sound_enabled
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            crossing_status: self.state.engine.status(),
            reason: status::decide(self.state.tide_level).reason,
            tide_level: self.state.tide_level,
            outlook: self.state.outlook,
            forecast: self.state.forecast.clone(),
            history: self.state.history.snapshot(),
            notifications_enabled: self.state.notifications_enabled,
            sound_enabled: self.state.sound_enabled,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn sound(&self) -> &A {
        &self.sound
    }

    fn fire_alerts(&mut self, reason: &str) {
        if self.state.notifications_enabled {
            if let Err(e) = self.notifier.notify(ALERT_TITLE, reason) {
                warn!(error = %e, "notification failed");
            }
        }
        if self.state.sound_enabled {
            if let Err(e) = self.sound.play() {
                warn!(error = %e, "alert sound failed");
            }
        }
    }

    fn persist(&mut self) {
        let snapshot = PersistedSnapshot::new(
            self.state.engine.status(),
            self.state.tide_level,
            self.state.history.latest(),
        );
        if let Err(e) = storage::save_snapshot(&mut self.store, &snapshot) {
            warn!(error = %e, "could not persist snapshot");
        }
    }
}

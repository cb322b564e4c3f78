//! # Crossing Dashboard Scenarios
//!
//! End-to-end checks that drive the controller the way the `run` loop does:
//! load a forecast, tick through the day, and reopen the same data directory.

use catraia_lib::alerts::{AlertError, AlertSound, Notifier, Permission};
use catraia_lib::controller::Controller;
use catraia_lib::forecast::{ForecastError, ForecastProvider, SimulatedForecast};
use catraia_lib::history::HISTORY_CAPACITY;
use catraia_lib::storage::{self, FileStore, MemoryStore, UserProfile};
use catraia_lib::{
    CrossingStatus, DailyForecast, InterruptionType, TideEvent, TideKind, TideLevel,
};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use tempfile::TempDir;

use crate::{Cli, Commands};

#[derive(Default)]
struct Inbox {
    received: Vec<String>,
}

impl Notifier for Inbox {
    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn notify(&mut self, _title: &str, body: &str) -> Result<(), AlertError> {
        self.received.push(body.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct Bell {
    rings: usize,
}

impl AlertSound for Bell {
    fn play(&mut self) -> Result<(), AlertError> {
        self.rings += 1;
        Ok(())
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    day().and_hms_opt(h, m, 0).unwrap()
}

/// Low 00:00, High 06:12, Low 12:24, High 18:36 with 0.3 m / 1.3 m extremes.
struct TextbookDay;

impl ForecastProvider for TextbookDay {
    async fn forecast(&self, _: NaiveDateTime) -> Result<Vec<DailyForecast>, ForecastError> {
        let event = |kind, h, m, height_meters| TideEvent {
            kind,
            instant: at(h, m),
            height_meters,
        };
        Ok(vec![DailyForecast {
            date: day(),
            events: vec![
                event(TideKind::Low, 0, 0, 0.3),
                event(TideKind::High, 6, 12, 1.3),
                event(TideKind::Low, 12, 24, 0.3),
                event(TideKind::High, 18, 36, 1.3),
            ],
        }])
    }
}

#[tokio::test]
async fn textbook_day_records_one_entry_per_interruption() {
    let mut controller = Controller::new(MemoryStore::new(), Inbox::default(), Bell::default());
    controller.enable_notifications();
    controller.toggle_sound();
    controller.load_forecast(&TextbookDay, at(0, 0)).await.unwrap();

    let dawn = controller.tick(at(3, 6)).unwrap();
    assert_eq!(dawn.level, TideLevel::Intermediate);
    assert!((dawn.height_meters.unwrap() - 0.8).abs() < 1e-9);

    for (h, m) in [(6, 12), (6, 13), (9, 18), (12, 24), (12, 30)] {
        controller.tick(at(h, m));
    }

    let view = controller.view();
    assert_eq!(view.crossing_status, CrossingStatus::Caution);
    assert_eq!(view.tide_level, TideLevel::Low);
    let kinds: Vec<_> = view.history.iter().map(|e| e.interruption_type).collect();
    assert_eq!(kinds, vec![InterruptionType::LowTide, InterruptionType::HighTide]);
    assert_eq!(view.history[0].timestamp, at(12, 24));

    assert_eq!(controller.notifier().received.len(), 2);
    assert_eq!(controller.sound().rings, 2);
}

#[tokio::test]
async fn history_stays_bounded_through_the_controller() {
    let mut controller = Controller::new(MemoryStore::new(), Inbox::default(), Bell::default());
    controller.load_forecast(&TextbookDay, at(0, 0)).await.unwrap();

    for _ in 0..HISTORY_CAPACITY + 5 {
        controller.tick(at(6, 12));
        controller.tick(at(9, 18));
    }

    let view = controller.view();
    assert_eq!(view.history.len(), HISTORY_CAPACITY);
    assert_eq!(view.crossing_status, CrossingStatus::Normal);
    // silent until notifications are enabled
    assert!(controller.notifier().received.is_empty());
}

#[tokio::test]
async fn reopening_the_data_directory_restores_the_snapshot() {
    let dir = TempDir::new().unwrap();

    {
        let mut controller =
            Controller::new(FileStore::new(dir.path()), Inbox::default(), Bell::default());
        controller.load_forecast(&TextbookDay, at(0, 0)).await.unwrap();
        controller.tick(at(6, 12));
        controller.tick(at(9, 18));
        controller.tick(at(12, 24));
    }
    assert!(dir.path().join("crossing-status.json").exists());

    let mut reopened =
        Controller::new(FileStore::new(dir.path()), Inbox::default(), Bell::default());
    let view = reopened.view();
    assert_eq!(view.crossing_status, CrossingStatus::Caution);
    assert_eq!(view.tide_level, TideLevel::Low);
    assert_eq!(view.history.len(), 1);
    assert_eq!(view.history[0].interruption_type, InterruptionType::LowTide);

    // restored Caution does not alert again
    reopened.enable_notifications();
    reopened.load_forecast(&TextbookDay, at(12, 25)).await.unwrap();
    let outcome = reopened.tick(at(12, 25)).unwrap();
    assert!(outcome.evaluation.alert.is_none());
    assert!(reopened.notifier().received.is_empty());
}

#[tokio::test]
async fn simulated_day_alerts_only_on_transitions() {
    let mut controller = Controller::new(MemoryStore::new(), Inbox::default(), Bell::default());
    controller.enable_notifications();
    controller
        .load_forecast(&SimulatedForecast, at(0, 0))
        .await
        .unwrap();
    assert!(!controller.needs_forecast(at(23, 59)));
    assert!(controller.needs_forecast(at(23, 59) + chrono::Duration::minutes(1)));

    let mut transitions = 0;
    let mut previous = CrossingStatus::Normal;
    for minute in 0..24 * 60 {
        let now = day().and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::minutes(minute);
        let outcome = controller.tick(now).unwrap();
        let status = outcome.evaluation.decision.status;
        if status != previous && status != CrossingStatus::Normal {
            transitions += 1;
        }
        previous = status;
    }

    let view = controller.view();
    assert!(transitions > 0);
    assert_eq!(view.history.len(), transitions.min(HISTORY_CAPACITY));
    assert_eq!(controller.notifier().received.len(), transitions);
    assert!(view.history.iter().all(|e| e.interruption_type.is_tide()));
    assert!(view
        .history
        .windows(2)
        .all(|pair| pair[0].timestamp >= pair[1].timestamp));
}

#[test]
fn profile_round_trips_through_the_data_directory() {
    let dir = TempDir::new().unwrap();
    let mut store = FileStore::new(dir.path());
    let profile = UserProfile::new("  Joana Prado ", "joana@example.com").unwrap();
    storage::save_profile(&mut store, &profile).unwrap();

    assert_eq!(crate::require_profile(&store).unwrap().first_name(), "Joana");
    storage::clear_profile(&mut store).unwrap();
    assert!(crate::require_profile(&store).is_err());
}

#[test]
fn cli_parses_run_flags() {
    let cli = Cli::try_parse_from(["catraia-alert", "run", "--sound", "--once"]).unwrap();
    match cli.cmd {
        Commands::Run {
            notifications,
            sound,
            once,
        } => {
            assert!(!notifications);
            assert!(sound);
            assert!(once);
        }
        other => panic!("unexpected command {other:?}"),
    }
    assert_eq!(cli.config, std::path::PathBuf::from("catraia-config.toml"));
}

#[test]
fn cli_requires_login_fields() {
    assert!(Cli::try_parse_from(["catraia-alert", "login", "--name", "Ana"]).is_err());
    let cli = Cli::try_parse_from([
        "catraia-alert",
        "--config",
        "other.toml",
        "login",
        "--name",
        "Ana",
        "--email",
        "ana@example.com",
    ])
    .unwrap();
    assert!(matches!(cli.cmd, Commands::Login { .. }));
    assert_eq!(cli.config, std::path::PathBuf::from("other.toml"));
}

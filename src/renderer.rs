//! # Dashboard Rendering
//!
//! Turns a [`DashboardView`] into terminal text. Every panel is a pure
//! function returning lines so the layout can be tested without a terminal;
//! the binary prints the joined result after each tick.

use crate::config::Config;
use crate::controller::DashboardView;
use crate::storage::UserProfile;
use crate::{quay_map, CrossingStatus, DailyForecast, HistoryEntry, TideKind};

const RULE_WIDTH: usize = 48;

/// Full dashboard as printable text.
pub fn render_dashboard(view: &DashboardView, config: &Config, user: Option<&UserProfile>) -> String {
    let mut lines = Vec::new();
    lines.extend(header(config, user));
    lines.push(String::new());
    lines.extend(status_panel(view));
    lines.push(String::new());
    lines.extend(tide_card(view));
    lines.push(String::new());
    lines.extend(quay_map::draw(view.tide_level, &config.crossing.destination).lines());
    lines.push(String::new());
    lines.extend(forecast_panel(&view.forecast));
    lines.push(String::new());
    lines.extend(controls(view));
    lines.push(String::new());
    lines.extend(history_panel(&view.history));
    lines.join("\n")
}

pub fn header(config: &Config, user: Option<&UserProfile>) -> Vec<String> {
    let mut title = format!("⛴  {}", config.crossing.name);
    if let Some(user) = user {
        title.push_str(&format!("    user: {}", user.first_name()));
    }
    vec![title, "═".repeat(RULE_WIDTH)]
}

pub fn status_label(status: CrossingStatus) -> String {
    let icon = match status {
        CrossingStatus::Normal => "✔",
        CrossingStatus::Caution => "⚠",
        CrossingStatus::Halted => "✋",
    };
    format!("{icon} {status}")
}

pub fn status_panel(view: &DashboardView) -> Vec<String> {
    vec![
        "CURRENT CONDITION".to_string(),
        status_label(view.crossing_status).to_uppercase(),
        view.reason.to_string(),
    ]
}

pub fn tide_card(view: &DashboardView) -> Vec<String> {
    let mut lines = vec![format!("Tide situation: {}", view.tide_level)];
    if let Some(outlook) = &view.outlook {
        lines.push(format!("  {}", outlook.summary()));
    }
    lines
}

/// Tab title for forecast day `index`: Today, Tomorrow, then the weekday.
pub fn tab_label(index: usize, day: &DailyForecast) -> String {
    match index {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => day.weekday(),
    }
}

pub fn forecast_panel(days: &[DailyForecast]) -> Vec<String> {
    let mut lines = vec!["Tide forecast".to_string(), "─".repeat(RULE_WIDTH)];
    if days.is_empty() {
        lines.push("Loading tide forecast...".to_string());
        return lines;
    }
    for (index, day) in days.iter().enumerate() {
        lines.push(format!("{} · {}", tab_label(index, day), day.display_date()));
        for event in &day.events {
            let (arrow, name) = match event.kind {
                TideKind::High => ('▲', "High tide"),
                TideKind::Low => ('▼', "Low tide"),
            };
            lines.push(format!(
                "  {arrow} {name:<9} {}  {:.2} m",
                event.instant.format("%H:%M"),
                event.height_meters
            ));
        }
    }
    lines
}

pub fn controls(view: &DashboardView) -> Vec<String> {
    let notifications = if view.notifications_enabled {
        "[x] Notifications enabled"
    } else {
        "[ ] Enable notifications"
    };
    let sound = if view.sound_enabled {
        "[x] Sound enabled"
    } else {
        "[ ] Enable sound"
    };
    vec![format!("{notifications}    {sound}")]
}

pub fn history_panel(history: &[HistoryEntry]) -> Vec<String> {
    let mut lines = vec!["Interruption history".to_string(), "─".repeat(RULE_WIDTH)];
    if history.is_empty() {
        lines.push("No interruptions recorded today.".to_string());
        return lines;
    }
    for entry in history {
        lines.push(format!(
            "{}  [{}] {}",
            entry.timestamp.format("%H:%M:%S - %d/%m/%Y"),
            entry.interruption_type.badge(),
            entry.reason
        ));
    }
    lines
}

//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! catraia-config.toml file. It provides a centralized way to configure the
//! crossing labels, the evaluation interval, alert defaults and the chat
//! assistant endpoint.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default configuration file, relative to the working directory
pub const CONFIG_FILE: &str = "catraia-config.toml";

/// Application configuration loaded from catraia-config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Crossing labels shown in the header and on the quay map
    pub crossing: CrossingConfig,
    /// Evaluation loop and local storage
    pub dashboard: DashboardConfig,
    /// Initial state of the alert controls
    pub alerts: AlertConfig,
    /// Generative chat assistant
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrossingConfig {
    /// Header title
    pub name: String,
    /// Town the catraia leaves from on the quay map
    pub origin: String,
    /// Town with the market basin and quay stairway
    pub destination: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Seconds between tide evaluations
    pub tick_seconds: u64,
    /// Directory for the snapshot and profile records
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Ask for notification permission at startup
    pub notifications: bool,
    /// Ring the terminal bell on alerts
    pub sound: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of the generative language API
    pub endpoint: String,
    /// Model used for the assistant
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for CrossingConfig {
    fn default() -> Self {
        CrossingConfig {
            name: "Crossing Alert VDC ⇄ Santos".to_string(),
            origin: "Santos".to_string(),
            destination: "Vicente de Carvalho".to_string(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            tick_seconds: 60,
            data_dir: PathBuf::from(".catraia"),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), crossing = %config.crossing.name, "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }
}

//! # Local Persistence
//!
//! The dashboard keeps two small records on disk:
//! - **`crossing-status`**: the last status, the last tide level and the
//!   newest history entry, used to seed the display after a restart
//! - **`user`**: the onboarding profile; without it the dashboard asks the
//!   user to log in first
//!
//! Storage is reached through the [`KeyValueStore`] port so the controller
//! never touches the filesystem directly. [`FileStore`] writes one JSON file
//! per key under the data directory; [`MemoryStore`] backs tests.
//!
//! A corrupt or unreadable record is never fatal: loaders log it and report
//! the record as absent.

use crate::{CrossingStatus, HistoryEntry, TideLevel};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;
use tracing::warn;

/// Key of the crash-recovery snapshot.
pub const SNAPSHOT_KEY: &str = "crossing-status";

/// Key of the user profile.
pub const PROFILE_KEY: &str = "user";

#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("storage IO: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded or decoded
    #[error("storage JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Keys become file names and must stay plain
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(&'static str),
}

/// String key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let plain = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !plain {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Last known state, rewritten after every evaluation.
///
/// Only the newest history entry is kept; the rest of the log lives in
/// memory and starts empty on each run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub crossing_status: CrossingStatus,
    pub tide_level: TideLevel,
    pub history: Vec<HistoryEntry>,
}

impl PersistedSnapshot {
    pub fn new(
        crossing_status: CrossingStatus,
        tide_level: TideLevel,
        newest: Option<&HistoryEntry>,
    ) -> Self {
        Self {
            crossing_status,
            tide_level,
            history: newest.cloned().into_iter().collect(),
        }
    }
}

/// Read the snapshot. Missing, unreadable or malformed records yield `None`.
pub fn load_snapshot(store: &impl KeyValueStore) -> Option<PersistedSnapshot> {
    load_record(store, SNAPSHOT_KEY)
}

pub fn save_snapshot(
    store: &mut impl KeyValueStore,
    snapshot: &PersistedSnapshot,
) -> Result<(), StoreError> {
    store.set(SNAPSHOT_KEY, &serde_json::to_string(snapshot)?)
}

/// Onboarding profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

impl UserProfile {
    /// Trimmed profile; both fields are required.
    pub fn new(name: &str, email: &str) -> Result<Self, StoreError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() {
            return Err(StoreError::InvalidProfile("name is required"));
        }
        if email.is_empty() {
            return Err(StoreError::InvalidProfile("email is required"));
        }
        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

pub fn load_profile(store: &impl KeyValueStore) -> Option<UserProfile> {
    load_record(store, PROFILE_KEY)
}

pub fn save_profile(store: &mut impl KeyValueStore, profile: &UserProfile) -> Result<(), StoreError> {
    store.set(PROFILE_KEY, &serde_json::to_string(profile)?)
}

pub fn clear_profile(store: &mut impl KeyValueStore) -> Result<(), StoreError> {
    store.remove(PROFILE_KEY)
}

fn load_record<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(key, error = %e, "could not read stored record");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed stored record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InterruptionType;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn entry() -> HistoryEntry {
        HistoryEntry {
            timestamp: NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(6, 12, 0)
                .unwrap(),
            reason: "High tide: disembark at quay stairway".to_string(),
            interruption_type: InterruptionType::HighTide,
        }
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("user").unwrap(), None);
        store.set("user", "{}").unwrap();
        assert_eq!(store.get("user").unwrap().as_deref(), Some("{}"));
        store.remove("user").unwrap();
        assert_eq!(store.get("user").unwrap(), None);
        // removing twice is fine
        store.remove("user").unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_snapshot_uses_camel_case_keys() {
        let snapshot =
            PersistedSnapshot::new(CrossingStatus::Caution, TideLevel::High, Some(&entry()));
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("crossingStatus").is_some());
        assert!(json.get("tideLevel").is_some());
        assert_eq!(json["history"].as_array().unwrap().len(), 1);
        assert!(json["history"][0].get("interruptionType").is_some());
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let mut store = MemoryStore::new();
        let snapshot =
            PersistedSnapshot::new(CrossingStatus::Caution, TideLevel::Low, Some(&entry()));
        save_snapshot(&mut store, &snapshot).unwrap();
        assert_eq!(load_snapshot(&store), Some(snapshot));
    }

    #[test]
    fn test_malformed_snapshot_is_ignored() {
        let mut store = MemoryStore::new();
        store.set(SNAPSHOT_KEY, "{not json").unwrap();
        assert_eq!(load_snapshot(&store), None);

        store.set(SNAPSHOT_KEY, r#"{"crossingStatus":"Sideways"}"#).unwrap();
        assert_eq!(load_snapshot(&store), None);
    }

    #[test]
    fn test_empty_history_snapshot() {
        let snapshot = PersistedSnapshot::new(CrossingStatus::Normal, TideLevel::Intermediate, None);
        assert!(snapshot.history.is_empty());
    }

    #[test]
    fn test_profile_lifecycle() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path());

        assert!(load_profile(&store).is_none());
        let profile = UserProfile::new("  Maria da Silva ", "maria@example.com").unwrap();
        save_profile(&mut store, &profile).unwrap();

        let loaded = load_profile(&store).unwrap();
        assert_eq!(loaded.name, "Maria da Silva");
        assert_eq!(loaded.first_name(), "Maria");

        clear_profile(&mut store).unwrap();
        assert!(load_profile(&store).is_none());
    }

    #[test]
    fn test_profile_requires_both_fields() {
        assert!(UserProfile::new("", "a@b.c").is_err());
        assert!(UserProfile::new("Ana", "   ").is_err());
    }
}

//! On-disk state store.
//!
//! Persists identities and pending reminders to a single JSON file
//! (default `~/.tellbot/state.json`). Loading an absent file yields an
//! empty state; a corrupt file is an error so a bad write never silently
//! wipes everyone's messages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BotError;
use crate::types::{Identity, Reminder};

const STATE_VERSION: u32 = 1;

/// Everything Tellbot persists between runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BotState {
    pub version: u32,
    pub identities: Vec<Identity>,
    pub reminders: Vec<Reminder>,
}

impl Default for BotState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            identities: Vec::new(),
            reminders: Vec::new(),
        }
    }
}

/// Handle on the state file. All I/O is synchronous: state writes happen
/// on delivery and on shutdown, well off any hot path.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default state file location (`~/.tellbot/state.json`).
    pub fn default_path() -> PathBuf {
        crate::utils::get_data_path().join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from disk. An absent file is a fresh start, not an error.
    pub fn load(&self) -> Result<BotState, BotError> {
        if !self.path.exists() {
            info!("No state file at {}, starting fresh", self.path.display());
            return Ok(BotState::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let state: BotState = serde_json::from_str(&content)?;
        debug!(
            identities = state.identities.len(),
            reminders = state.reminders.len(),
            "State loaded from {}",
            self.path.display()
        );
        Ok(state)
    }

    /// Write state to disk, creating parent directories as needed.
    pub fn save(&self, state: &BotState) -> Result<(), BotError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)?;
        debug!("State saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_absent_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = store.load().unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.identities.is_empty());
        assert!(state.reminders.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        let mut state = BotState::default();
        state.identities.push(Identity::new("Alice"));
        state
            .reminders
            .push(Reminder::new("Bob", "the build is done", "Alice", 100, 0));
        store.save(&state).unwrap();

        let back = store.load().unwrap();
        assert_eq!(back.identities.len(), 1);
        assert_eq!(back.identities[0].user_name, "Alice");
        assert_eq!(back.reminders.len(), 1);
        assert_eq!(back.reminders[0].target, "Bob");
    }

    #[test]
    fn test_load_corrupt_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ broken").unwrap();

        let store = StateStore::new(&path);
        assert!(matches!(store.load(), Err(BotError::Format(_))));
    }
}

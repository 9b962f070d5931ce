use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulation::buff::BuffId;
use crate::simulation::region::RegionBalance;
use crate::simulation::session::SessionState;

fn default_snapshot_version() -> u32 {
    1
}

/// Best-effort picture of a running session. Never read back by the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveSnapshot {
    #[serde(default = "default_snapshot_version")]
    pub version: u32,
    pub relax_gauge: f64,
    pub combo: u32,
    #[serde(default)]
    pub max_combo: u32,
    #[serde(default)]
    pub miss_count: u32,
    pub balance: RegionBalance,
    #[serde(default)]
    pub used_buffs: BTreeSet<BuffId>,
    #[serde(default)]
    pub active_buffs: BTreeSet<BuffId>,
    pub saved_at: DateTime<Utc>,
}

impl AutosaveSnapshot {
    pub fn capture(state: &SessionState, saved_at: DateTime<Utc>) -> Self {
        Self {
            version: default_snapshot_version(),
            relax_gauge: state.relax_gauge,
            combo: state.combo,
            max_combo: state.max_combo,
            miss_count: state.miss_count,
            balance: state.balance.clone(),
            used_buffs: state.used_buffs.clone(),
            active_buffs: state.active_buffs.clone(),
            saved_at,
        }
    }

    pub fn to_json(&self) -> Result<String, AutosaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, AutosaveError> {
        Ok(serde_json::from_str(data)?)
    }
}

#[derive(Debug, Error)]
pub enum AutosaveError {
    #[error("autosave io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("autosave encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("autosave sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub trait AutosaveStore {
    fn save(&mut self, snapshot: &AutosaveSnapshot) -> Result<(), AutosaveError>;
    fn load_latest(&self) -> Result<Option<AutosaveSnapshot>, AutosaveError>;
}

/// Overwrites a single JSON file on every save.
pub struct JsonFileAutosave {
    path: PathBuf,
}

impl JsonFileAutosave {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AutosaveStore for JsonFileAutosave {
    fn save(&mut self, snapshot: &AutosaveSnapshot) -> Result<(), AutosaveError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, snapshot.to_json()?)?;
        Ok(())
    }

    fn load_latest(&self) -> Result<Option<AutosaveSnapshot>, AutosaveError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)?;
        AutosaveSnapshot::from_json(&data).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::region::Region;

    fn snapshot() -> AutosaveSnapshot {
        let mut state = SessionState::new();
        state.relax_gauge = 42.5;
        state.combo = 7;
        state.max_combo = 12;
        state.balance.add(Region::Thigh, 9.0);
        state.used_buffs.insert(BuffId::ComboBoost);
        state.active_buffs.insert(BuffId::ComboBoost);
        AutosaveSnapshot::capture(&state, Utc::now())
    }

    #[test]
    fn json_file_store_keeps_the_last_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileAutosave::new(dir.path().join("saves/autosave.json"));
        assert!(store.load_latest().unwrap().is_none());

        let first = snapshot();
        store.save(&first).unwrap();
        let mut second = first.clone();
        second.combo = 0;
        store.save(&second).unwrap();

        let loaded = store.load_latest().unwrap().unwrap();
        assert_eq!(loaded, second);
        assert_eq!(loaded.balance.get(Region::Thigh), 9.0);
    }

    #[test]
    fn snapshot_json_names_buffs_and_regions() {
        let json: serde_json::Value = serde_json::from_str(&snapshot().to_json().unwrap()).unwrap();
        assert_eq!(json["used_buffs"][0], "combo_boost");
        assert_eq!(json["balance"]["thigh"], 9.0);
        assert_eq!(json["version"], 1);
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::csv::DEFAULT_CSV_DIR;
use crate::systems::dialogue::DialogueMode;
use crate::ui::notification::VolumeChannel;

pub const DEFAULT_AUTOSAVE_INTERVAL_MS: f64 = 5000.0;
pub const DEFAULT_INTRO_SCENE: &str = "intro";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Which combo rule scores hits; the tempo window comes from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComboMode {
    #[default]
    Reaction,
    Tempo,
}

/// Volume levels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub master: f64,
    pub bgm: f64,
    pub se: f64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master: 0.7,
            bgm: 0.6,
            se: 0.7,
        }
    }
}

impl AudioSettings {
    pub fn level(&self, channel: VolumeChannel) -> f64 {
        match channel {
            VolumeChannel::Master => self.master,
            VolumeChannel::Bgm => self.bgm,
            VolumeChannel::Se => self.se,
        }
    }

    pub fn set_level(&mut self, channel: VolumeChannel, level: f64) {
        let level = level.clamp(0.0, 1.0);
        match channel {
            VolumeChannel::Master => self.master = level,
            VolumeChannel::Bgm => self.bgm = level,
            VolumeChannel::Se => self.se = level,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub content_dir: PathBuf,
    /// SQLite content database; takes precedence over `content_dir`.
    pub content_db: Option<PathBuf>,
    /// `.json` file or `.db` SQLite database; autosave is off when unset.
    pub autosave_path: Option<PathBuf>,
    pub autosave_interval_ms: f64,
    pub dialogue_mode: DialogueMode,
    pub intro_scene: String,
    pub combo_mode: ComboMode,
    /// Fixed seed for target selection; entropy when unset.
    pub seed: Option<u64>,
    pub audio: AudioSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(DEFAULT_CSV_DIR),
            content_db: None,
            autosave_path: None,
            autosave_interval_ms: DEFAULT_AUTOSAVE_INTERVAL_MS,
            dialogue_mode: DialogueMode::Simple,
            intro_scene: DEFAULT_INTRO_SCENE.to_string(),
            combo_mode: ComboMode::Reaction,
            seed: None,
            audio: AudioSettings::default(),
        }
    }
}

impl GameConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Applies command-line overrides on top of the loaded values.
    pub fn apply_args(&mut self, args: &[String]) {
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--content" => {
                    if let Some(value) = iter.next() {
                        self.content_dir = PathBuf::from(value);
                    }
                }
                "--db" => {
                    if let Some(value) = iter.next() {
                        self.content_db = Some(PathBuf::from(value));
                    }
                }
                "--autosave" => {
                    if let Some(value) = iter.next() {
                        self.autosave_path = Some(PathBuf::from(value));
                    }
                }
                "--seed" => {
                    if let Some(value) = iter.next().and_then(|v| v.parse().ok()) {
                        self.seed = Some(value);
                    }
                }
                "--extended" => self.dialogue_mode = DialogueMode::Extended,
                "--tempo" => self.combo_mode = ComboMode::Tempo,
                _ => {}
            }
        }
    }
}

/// Finds `--config <path>` among the arguments.
pub fn config_path(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .position(|arg| arg == "--config")
        .and_then(|idx| args.get(idx + 1))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        fs::write(
            &path,
            r#"{ "dialogue_mode": "extended", "audio": { "bgm": 0.2 }, "seed": 9 }"#,
        )
        .unwrap();

        let config = GameConfig::load(&path).unwrap();
        assert_eq!(config.dialogue_mode, DialogueMode::Extended);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.audio.bgm, 0.2);
        assert_eq!(config.audio.master, 0.7);
        assert_eq!(config.autosave_interval_ms, DEFAULT_AUTOSAVE_INTERVAL_MS);
        assert_eq!(config.intro_scene, DEFAULT_INTRO_SCENE);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(GameConfig::load(&path), Err(ConfigError::Json { .. })));
        assert!(matches!(
            GameConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn flags_override_values() {
        let argv = args(&["bin", "--config", "x.json", "--seed", "42", "--tempo", "--db", "c.db"]);
        let mut config = GameConfig::default();
        config.apply_args(&argv);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.combo_mode, ComboMode::Tempo);
        assert_eq!(config.content_db, Some(PathBuf::from("c.db")));
        assert_eq!(config_path(&argv), Some(PathBuf::from("x.json")));
    }

    #[test]
    fn volume_levels_are_clamped() {
        let mut audio = AudioSettings::default();
        audio.set_level(VolumeChannel::Se, 1.5);
        assert_eq!(audio.level(VolumeChannel::Se), 1.0);
    }
}

use std::collections::HashMap;

use bevy_ecs::prelude::*;
use tracing::{debug, info, warn};

use crate::content::repository::{ContentRepository, ContentRow, EntityType};
use crate::rules::combo::{DEFAULT_COMBO_WINDOW_MAX_SECS, DEFAULT_COMBO_WINDOW_MIN_SECS};
use crate::rules::ending::EndingId;
use crate::rules::gain::DEFAULT_BASE_GAIN;
use crate::simulation::buff::BuffId;
use crate::simulation::region::Region;
use crate::simulation::time::{secs_to_millis, Millis};

pub const DEFAULT_BUFF_DURATION_SECS: f64 = 10.0;
pub const UNKNOWN_SPEAKER: &str = "Unknown";

pub const COMBO_WINDOW_MIN_KEY: &str = "combo_window_min";
pub const COMBO_WINDOW_MAX_KEY: &str = "combo_window_max";

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDef {
    pub char_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneDef {
    pub scene_id: String,
    pub bg_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLine {
    pub scene_id: String,
    pub char_id: String,
    /// One-based position within the scene.
    pub order: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndingDef {
    pub ending_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillDef {
    pub skill_id: String,
    pub name: String,
    pub duration_secs: Option<f64>,
}

/// Per-entity outcome of the startup load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<(EntityType, usize)>,
    pub failures: Vec<(EntityType, String)>,
}

impl LoadReport {
    /// Nothing at all could be read.
    pub fn is_total_failure(&self) -> bool {
        self.loaded.is_empty() && !self.failures.is_empty()
    }

    pub fn failure_summary(&self) -> String {
        self.failures
            .iter()
            .map(|(entity, reason)| format!("{}: {}", entity, reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Typed content, parsed once at startup.
#[derive(Resource, Debug, Clone, Default)]
pub struct ContentTables {
    pub characters: Vec<CharacterDef>,
    pub scenes: Vec<SceneDef>,
    pub dialogues: Vec<DialogueLine>,
    pub endings: Vec<EndingDef>,
    pub skills: Vec<SkillDef>,
    click_areas: HashMap<Region, f64>,
    balance: HashMap<String, f64>,
    raw: HashMap<EntityType, Vec<ContentRow>>,
    pub report: LoadReport,
}

impl ContentTables {
    /// Loads every entity type; a failing source leaves that type empty.
    pub fn load(repo: &dyn ContentRepository) -> Self {
        let mut raw = HashMap::new();
        let mut report = LoadReport::default();

        for entity in EntityType::ALL {
            match repo.rows(entity) {
                Ok(rows) => {
                    report.loaded.push((entity, rows.len()));
                    raw.insert(entity, rows);
                }
                Err(err) => {
                    warn!(entity = %entity, error = %err, "content load failed, using empty set");
                    report.failures.push((entity, err.to_string()));
                    raw.insert(entity, Vec::new());
                }
            }
        }

        let tables = Self::from_raw(raw, report);
        info!(
            loaded = tables.report.loaded.len(),
            failed = tables.report.failures.len(),
            "content loaded"
        );
        tables
    }

    pub fn from_raw(raw: HashMap<EntityType, Vec<ContentRow>>, report: LoadReport) -> Self {
        let rows = |entity: EntityType| raw.get(&entity).map(Vec::as_slice).unwrap_or(&[]);

        let characters = rows(EntityType::Characters)
            .iter()
            .filter_map(|row| {
                Some(CharacterDef {
                    char_id: row.get("char_id")?.to_string(),
                    name: row.get("name").unwrap_or(UNKNOWN_SPEAKER).to_string(),
                })
            })
            .collect();

        let scenes = rows(EntityType::Scenes)
            .iter()
            .filter_map(|row| {
                Some(SceneDef {
                    scene_id: row.get("scene_id")?.to_string(),
                    bg_image: row
                        .get("bg_image")
                        .filter(|value| !value.is_empty())
                        .map(str::to_string),
                })
            })
            .collect();

        let dialogues = rows(EntityType::Dialogues)
            .iter()
            .filter_map(parse_dialogue)
            .collect();

        let endings = rows(EntityType::Endings)
            .iter()
            .filter_map(|row| {
                let ending_id = row.get("ending_id")?.to_string();
                let name = row
                    .get("name")
                    .filter(|value| !value.is_empty())
                    .unwrap_or(&ending_id)
                    .to_string();
                Some(EndingDef { ending_id, name })
            })
            .collect();

        let skills = rows(EntityType::Skills)
            .iter()
            .filter_map(|row| {
                let skill_id = row.get("skill_id")?.to_string();
                Some(SkillDef {
                    name: row.get("name").unwrap_or(&skill_id).to_string(),
                    duration_secs: row.parse::<f64>("duration").filter(|d| *d > 0.0),
                    skill_id,
                })
            })
            .collect();

        let mut click_areas = HashMap::new();
        for row in rows(EntityType::ClickAreas) {
            let Some(region) = row.get("part_id").and_then(|id| id.parse::<Region>().ok()) else {
                debug!(part = ?row.get("part_id"), "skipping click area with unknown part");
                continue;
            };
            let base_gain = row
                .parse::<f64>("base_gain")
                .filter(|gain| gain.is_finite() && *gain >= 0.0)
                .unwrap_or(DEFAULT_BASE_GAIN);
            click_areas.insert(region, base_gain);
        }

        let mut balance = HashMap::new();
        for row in rows(EntityType::GameBalance) {
            let Some(key) = row.get("key") else {
                continue;
            };
            match row.parse::<f64>("value") {
                Some(value) if value.is_finite() => {
                    balance.insert(key.to_string(), value);
                }
                _ => debug!(key, "ignoring unparsable balance value"),
            }
        }

        Self {
            characters,
            scenes,
            dialogues,
            endings,
            skills,
            click_areas,
            balance,
            raw,
            report,
        }
    }

    /// Raw rows for presentation-only entity types.
    pub fn rows(&self, entity: EntityType) -> &[ContentRow] {
        self.raw.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn base_gain(&self, region: Region) -> f64 {
        self.click_areas
            .get(&region)
            .copied()
            .unwrap_or(DEFAULT_BASE_GAIN)
    }

    pub fn balance_or(&self, key: &str, default: f64) -> f64 {
        self.balance.get(key).copied().unwrap_or(default)
    }

    pub fn combo_window_secs(&self) -> (f64, f64) {
        (
            self.balance_or(COMBO_WINDOW_MIN_KEY, DEFAULT_COMBO_WINDOW_MIN_SECS),
            self.balance_or(COMBO_WINDOW_MAX_KEY, DEFAULT_COMBO_WINDOW_MAX_SECS),
        )
    }

    pub fn buff_duration_ms(&self, buff: BuffId) -> Millis {
        let secs = self
            .skills
            .iter()
            .find(|skill| skill.skill_id == buff.as_str())
            .and_then(|skill| skill.duration_secs)
            .unwrap_or(DEFAULT_BUFF_DURATION_SECS);
        secs_to_millis(secs)
    }

    pub fn character(&self, char_id: &str) -> Option<&CharacterDef> {
        self.characters.iter().find(|c| c.char_id == char_id)
    }

    pub fn character_name(&self, char_id: &str) -> String {
        self.character(char_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string())
    }

    /// An unknown id is accepted only when no characters are defined at all.
    pub fn is_selectable_character(&self, char_id: &str) -> bool {
        self.characters.is_empty() || self.character(char_id).is_some()
    }

    pub fn background_for(&self, scene_id: &str) -> Option<String> {
        self.scenes
            .iter()
            .find(|scene| scene.scene_id == scene_id)
            .and_then(|scene| scene.bg_image.clone())
    }

    /// Dialogue line at one-based `order`, optionally limited to one speaker.
    pub fn dialogue_line(
        &self,
        scene_id: &str,
        order: u32,
        char_id: Option<&str>,
    ) -> Option<&DialogueLine> {
        self.dialogues.iter().find(|line| {
            line.scene_id == scene_id
                && line.order == order
                && char_id.map_or(true, |id| line.char_id == id)
        })
    }

    pub fn ending_title(&self, ending: EndingId) -> String {
        self.endings
            .iter()
            .find(|def| def.ending_id == ending.as_str())
            .map(|def| def.name.clone())
            .unwrap_or_else(|| ending.as_str().to_string())
    }

    pub fn ending_text(&self, ending: EndingId) -> String {
        let scene = ending.scene_id();
        self.dialogues
            .iter()
            .filter(|line| line.scene_id == scene)
            .min_by_key(|line| line.order)
            .map(|line| line.text.clone())
            .unwrap_or_default()
    }
}

fn parse_dialogue(row: &ContentRow) -> Option<DialogueLine> {
    let scene_id = row.get("scene_id")?.to_string();
    let Some(order) = row.parse::<u32>("order") else {
        debug!(scene = %scene_id, "dropping dialogue row without a numeric order");
        return None;
    };
    Some(DialogueLine {
        scene_id,
        char_id: row.get("char_id").unwrap_or_default().to_string(),
        order,
        text: row.get("text").unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::repository::{row, MemoryContentRepository};

    fn repo() -> MemoryContentRepository {
        MemoryContentRepository::new()
            .with_rows(
                EntityType::ClickAreas,
                vec![
                    row(&[("part_id", "shoulder"), ("base_gain", "1.5")]),
                    row(&[("part_id", "neck"), ("base_gain", "lots")]),
                    row(&[("part_id", "elbow"), ("base_gain", "9")]),
                ],
            )
            .with_rows(
                EntityType::GameBalance,
                vec![
                    row(&[("key", "combo_window_min"), ("value", "0.3")]),
                    row(&[("key", "combo_window_max"), ("value", "?")]),
                ],
            )
            .with_rows(
                EntityType::Skills,
                vec![row(&[
                    ("skill_id", "deep_release"),
                    ("name", "Deep Release"),
                    ("duration", "8"),
                ])],
            )
            .with_rows(
                EntityType::Dialogues,
                vec![
                    row(&[("scene_id", "intro"), ("char_id", "koharu"), ("order", "1"), ("text", "Hi")]),
                    row(&[("scene_id", "intro"), ("char_id", "koharu"), ("order", "x"), ("text", "??")]),
                    row(&[("scene_id", "e1"), ("char_id", "koharu"), ("order", "2"), ("text", "Later")]),
                    row(&[("scene_id", "e1"), ("char_id", "koharu"), ("order", "1"), ("text", "Light!")]),
                ],
            )
            .with_rows(
                EntityType::Characters,
                vec![row(&[("char_id", "koharu"), ("name", "Koharu")])],
            )
            .with_rows(
                EntityType::Endings,
                vec![row(&[("ending_id", "E1"), ("name", "Light Shoulders")])],
            )
    }

    #[test]
    fn click_area_gain_defaults_when_missing_or_unparsable() {
        let tables = ContentTables::load(&repo());
        assert_eq!(tables.base_gain(Region::Shoulder), 1.5);
        assert_eq!(tables.base_gain(Region::Neck), DEFAULT_BASE_GAIN);
        assert_eq!(tables.base_gain(Region::Foot), DEFAULT_BASE_GAIN);
    }

    #[test]
    fn balance_constants_fall_back_per_key() {
        let tables = ContentTables::load(&repo());
        assert_eq!(tables.combo_window_secs(), (0.3, DEFAULT_COMBO_WINDOW_MAX_SECS));
    }

    #[test]
    fn buff_duration_reads_skills_table() {
        let tables = ContentTables::load(&repo());
        assert_eq!(tables.buff_duration_ms(BuffId::DeepRelease), 8000.0);
        assert_eq!(tables.buff_duration_ms(BuffId::ComboBoost), 10_000.0);
    }

    #[test]
    fn dialogue_rows_without_order_are_dropped() {
        let tables = ContentTables::load(&repo());
        assert_eq!(tables.dialogues.len(), 3);
        assert_eq!(
            tables.dialogue_line("intro", 1, Some("koharu")).map(|l| l.text.as_str()),
            Some("Hi")
        );
        assert!(tables.dialogue_line("intro", 1, Some("someone")).is_none());
    }

    #[test]
    fn ending_lookups_use_defaults() {
        let tables = ContentTables::load(&repo());
        assert_eq!(tables.ending_title(EndingId::E1), "Light Shoulders");
        assert_eq!(tables.ending_text(EndingId::E1), "Light!");
        assert_eq!(tables.ending_title(EndingId::E3), "E3");
        assert_eq!(tables.ending_text(EndingId::E3), "");
        assert_eq!(tables.character_name("nobody"), UNKNOWN_SPEAKER);
    }

    #[test]
    fn missing_sources_are_reported_but_not_fatal() {
        let tables = ContentTables::load(&repo());
        assert_eq!(tables.report.loaded.len(), 6);
        assert_eq!(tables.report.failures.len(), 10);
        assert!(!tables.report.is_total_failure());
        assert!(tables.rows(EntityType::UiFonts).is_empty());

        let empty = ContentTables::load(&MemoryContentRepository::new());
        assert!(empty.report.is_total_failure());
    }
}

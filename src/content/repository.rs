use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::rules::ParseEnumError;

/// Kinds of content rows the game reads at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Scenes,
    Characters,
    Dialogues,
    CharacterLevels,
    Endings,
    UiElements,
    UiPanels,
    UiIcons,
    ClickAreas,
    UiAnimations,
    UiFonts,
    UiResponsive,
    GameBalance,
    SoundEffects,
    MassageParts,
    Skills,
}

impl EntityType {
    /// Load order.
    pub const ALL: [EntityType; 16] = [
        EntityType::Scenes,
        EntityType::Characters,
        EntityType::Dialogues,
        EntityType::CharacterLevels,
        EntityType::Endings,
        EntityType::UiElements,
        EntityType::UiPanels,
        EntityType::UiIcons,
        EntityType::ClickAreas,
        EntityType::UiAnimations,
        EntityType::UiFonts,
        EntityType::UiResponsive,
        EntityType::GameBalance,
        EntityType::SoundEffects,
        EntityType::MassageParts,
        EntityType::Skills,
    ];

    /// Source name: CSV file stem or SQLite table.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Scenes => "scenes",
            EntityType::Characters => "characters",
            EntityType::Dialogues => "dialogues",
            EntityType::CharacterLevels => "character_levels",
            EntityType::Endings => "endings",
            EntityType::UiElements => "ui_elements",
            EntityType::UiPanels => "ui_panels",
            EntityType::UiIcons => "ui_icons",
            EntityType::ClickAreas => "click_areas",
            EntityType::UiAnimations => "ui_animations",
            EntityType::UiFonts => "ui_fonts",
            EntityType::UiResponsive => "ui_responsive",
            EntityType::GameBalance => "game_balance",
            EntityType::SoundEffects => "sound_effects",
            EntityType::MassageParts => "massage_parts",
            EntityType::Skills => "skills",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|entity| entity.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                value: s.to_string(),
            })
    }
}

/// One content row: column header to raw string value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentRow(BTreeMap<String, String>);

impl ContentRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Parsed field value; `None` when the field is absent or does not parse.
    pub fn parse<T: FromStr>(&self, field: &str) -> Option<T> {
        self.get(field).and_then(|value| value.trim().parse().ok())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ContentRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("no source for {0}")]
    MissingSource(EntityType),
}

/// Read-only source of content rows keyed by entity type.
pub trait ContentRepository {
    fn rows(&self, entity: EntityType) -> Result<Vec<ContentRow>, ContentError>;
}

/// Rows held in memory; entity types never inserted read as missing.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentRepository {
    tables: HashMap<EntityType, Vec<ContentRow>>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, entity: EntityType, rows: Vec<ContentRow>) -> Self {
        self.insert(entity, rows);
        self
    }

    pub fn insert(&mut self, entity: EntityType, rows: Vec<ContentRow>) {
        self.tables.entry(entity).or_default().extend(rows);
    }
}

impl ContentRepository for MemoryContentRepository {
    fn rows(&self, entity: EntityType) -> Result<Vec<ContentRow>, ContentError> {
        self.tables
            .get(&entity)
            .cloned()
            .ok_or(ContentError::MissingSource(entity))
    }
}

/// Builds a row from literal pairs.
pub fn row(pairs: &[(&str, &str)]) -> ContentRow {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_names_round_trip() {
        for entity in EntityType::ALL {
            assert_eq!(entity.as_str().parse::<EntityType>().ok(), Some(entity));
        }
        assert_eq!(EntityType::ALL.len(), 16);
    }

    #[test]
    fn row_parse_falls_back_to_none() {
        let r = row(&[("base_gain", " 1.5 "), ("duration", "ten")]);
        assert_eq!(r.parse::<f64>("base_gain"), Some(1.5));
        assert_eq!(r.parse::<f64>("duration"), None);
        assert_eq!(r.parse::<f64>("missing"), None);
    }

    #[test]
    fn memory_repository_reports_missing_tables() {
        let repo = MemoryContentRepository::new()
            .with_rows(EntityType::Skills, vec![row(&[("skill_id", "combo_boost")])]);
        assert_eq!(repo.rows(EntityType::Skills).unwrap().len(), 1);
        assert!(matches!(
            repo.rows(EntityType::Endings),
            Err(ContentError::MissingSource(EntityType::Endings))
        ));
    }
}

use std::collections::BTreeSet;
use std::fmt;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::rules::ending::EndingId;
use crate::simulation::buff::BuffId;
use crate::simulation::region::{Region, RegionBalance};
use crate::simulation::time::Millis;

pub const MAX_RELAX_GAUGE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    #[default]
    Title,
    Dialog,
    Game,
    Ending,
    Config,
}

impl Screen {
    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Title => "title",
            Screen::Dialog => "dialog",
            Screen::Game => "game",
            Screen::Ending => "ending",
            Screen::Config => "config",
        }
    }

    /// Scene row whose background is shown behind this screen.
    pub fn scene_id(self) -> &'static str {
        match self {
            Screen::Game => "therapy_room",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DialogueCursor {
    pub scene: String,
    pub index: usize,
}

/// Region currently highlighted and when it was highlighted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub region: Region,
    pub started_at: Millis,
}

impl Target {
    pub fn elapsed(&self, now: Millis) -> Millis {
        now - self.started_at
    }
}

/// The single mutable aggregate of a play session.
#[derive(Resource, Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub screen: Screen,
    pub selected_character: Option<String>,
    pub dialogue_cursor: DialogueCursor,
    pub relax_gauge: f64,
    pub combo: u32,
    pub max_combo: u32,
    pub miss_count: u32,
    pub balance: RegionBalance,
    pub active_buffs: BTreeSet<BuffId>,
    pub used_buffs: BTreeSet<BuffId>,
    /// Buff between its cut-in and its activation; holds the single buff slot.
    pub cutin_buff: Option<BuffId>,
    pub current_target: Option<Target>,
    pub last_hit_at: Option<Millis>,
    /// Gauge reached the top; the target loop is stopped and the ending is pending.
    pub completed: bool,
    pub ending: Option<EndingId>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every field to its initial value.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn add_relax(&mut self, amount: f64) {
        self.relax_gauge = (self.relax_gauge + amount).clamp(0.0, MAX_RELAX_GAUGE);
    }

    pub fn gauge_full(&self) -> bool {
        self.relax_gauge >= MAX_RELAX_GAUGE
    }

    /// True while a buff is in cut-in or active.
    pub fn buff_slot_taken(&self) -> bool {
        self.cutin_buff.is_some() || !self.active_buffs.is_empty()
    }

    pub fn target_pending(&self) -> bool {
        self.screen == Screen::Game && !self.completed && self.current_target.is_some()
    }
}

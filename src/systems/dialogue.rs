use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::content::tables::ContentTables;
use crate::simulation::session::DialogueCursor;
use crate::simulation::time::Millis;
use crate::systems::scheduler::{FiredTimer, Timer};
use crate::systems::session::Session;
use crate::ui::notification::Notification;

/// Interval between revealed characters of a dialogue line.
pub const REVEAL_CHAR_MS: Millis = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogueMode {
    /// One intro line, any speaker.
    #[default]
    Simple,
    /// Three intro lines spoken by the selected character.
    Extended,
}

impl DialogueMode {
    pub fn line_count(self) -> usize {
        match self {
            DialogueMode::Simple => 1,
            DialogueMode::Extended => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogueStep {
    Line { speaker: String, text: String },
    Finished,
}

/// Line under the cursor, or `Finished` once the mode's line count is reached
/// or the next line is missing from content.
pub fn current_step(
    content: &ContentTables,
    mode: DialogueMode,
    cursor: &DialogueCursor,
    character: Option<&str>,
) -> DialogueStep {
    if cursor.index >= mode.line_count() {
        return DialogueStep::Finished;
    }
    let order = (cursor.index + 1) as u32;
    let speaker_filter = match mode {
        DialogueMode::Simple => None,
        DialogueMode::Extended => character,
    };
    match content.dialogue_line(&cursor.scene, order, speaker_filter) {
        Some(line) => DialogueStep::Line {
            speaker: content.character_name(&line.char_id),
            text: line.text.clone(),
        },
        None => DialogueStep::Finished,
    }
}

/// System: typewriter effect, one more character of the line per tick.
pub fn dialogue_reveal_system(fired: Res<FiredTimer>, mut session: Session) {
    if fired.0 != Some(Timer::DialogueReveal) {
        return;
    }
    let Some(reveal) = session.timers.reveal.as_mut() else {
        return;
    };
    reveal.shown += 1;
    let shown = reveal.shown;
    let done = shown >= reveal.total_chars;
    session.notify(Notification::DialogueReveal {
        visible_chars: shown,
    });
    if done {
        session.timers.cancel_reveal(&mut session.scheduler);
    }
}

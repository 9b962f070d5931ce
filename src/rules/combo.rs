use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_COMBO_WINDOW_MIN_SECS: f64 = 0.35;
pub const DEFAULT_COMBO_WINDOW_MAX_SECS: f64 = 0.65;
pub const MAX_COMBO_MULTIPLIER: f64 = 2.0;
const COMBO_MULTIPLIER_STEP: f64 = 0.1;

/// How a hit moves the streak counter. Misses always zero it.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComboRule {
    /// Every in-window hit extends the streak.
    Reaction,
    /// The gap since the previous hit must land inside a tempo window.
    Tempo {
        window_min_secs: f64,
        window_max_secs: f64,
    },
}

impl Default for ComboRule {
    fn default() -> Self {
        ComboRule::Reaction
    }
}

impl ComboRule {
    pub fn tempo_default() -> Self {
        ComboRule::Tempo {
            window_min_secs: DEFAULT_COMBO_WINDOW_MIN_SECS,
            window_max_secs: DEFAULT_COMBO_WINDOW_MAX_SECS,
        }
    }

    /// `since_last_hit_secs` is `None` when no hit has been scored yet this session.
    pub fn next_combo(&self, previous: u32, since_last_hit_secs: Option<f64>) -> u32 {
        match *self {
            ComboRule::Reaction => previous.saturating_add(1),
            ComboRule::Tempo {
                window_min_secs,
                window_max_secs,
            } => match since_last_hit_secs {
                Some(delta) => {
                    compute_combo_transition(previous, delta, window_min_secs, window_max_secs)
                }
                None => 1,
            },
        }
    }
}

/// Tempo streak: a hit inside `[window_min, window_max]` seconds after the
/// previous one extends the streak, anything else restarts it at one.
pub fn compute_combo_transition(
    previous: u32,
    delta_secs: f64,
    window_min: f64,
    window_max: f64,
) -> u32 {
    if previous == 0 {
        return 1;
    }
    if delta_secs >= window_min && delta_secs <= window_max {
        previous.saturating_add(1)
    } else {
        1
    }
}

/// 1.0 at the first hit, +0.1 per further hit, capped at 2.0 (combo 11).
pub fn combo_multiplier(combo: u32) -> f64 {
    let steps = combo.saturating_sub(1) as f64;
    (1.0 + steps * COMBO_MULTIPLIER_STEP).min(MAX_COMBO_MULTIPLIER)
}

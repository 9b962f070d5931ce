use crate::rules::combo::combo_multiplier;
use crate::simulation::buff::BuffId;
use crate::simulation::time::Millis;

pub const DEFAULT_BASE_GAIN: f64 = 1.0;
/// Reaction window for a target; a click later than this is a miss.
pub const REACTION_WINDOW_MS: Millis = 3000.0;
pub const MIN_TIME_BONUS: f64 = 0.5;

/// Linear decay from 1.0 for an instant reaction down to the 0.5 floor.
pub fn time_bonus(reaction_ms: Millis, window_ms: Millis) -> f64 {
    if window_ms <= 0.0 {
        return MIN_TIME_BONUS;
    }
    let reaction = reaction_ms.max(0.0);
    ((window_ms - reaction) / window_ms).max(MIN_TIME_BONUS)
}

/// Sum of the additive bonuses of the given buffs.
pub fn buff_multiplier_bonus<'a, I>(active: I) -> f64
where
    I: IntoIterator<Item = &'a BuffId>,
{
    active.into_iter().map(|buff| buff.gain_bonus()).sum()
}

pub fn buff_multiplier<'a, I>(active: I) -> f64
where
    I: IntoIterator<Item = &'a BuffId>,
{
    1.0 + buff_multiplier_bonus(active)
}

/// Gain of a single hit.
pub fn gain<'a, I>(base_gain: f64, combo: u32, active: I, reaction_ms: Millis) -> f64
where
    I: IntoIterator<Item = &'a BuffId>,
{
    base_gain
        * combo_multiplier(combo)
        * buff_multiplier(active)
        * time_bonus(reaction_ms, REACTION_WINDOW_MS)
}

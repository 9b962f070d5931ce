use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rules::ParseEnumError;

/// Timed gain bonus that fires on its own once its thresholds are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffId {
    /// Needs a long streak on a half-full gauge.
    ComboBoost,
    /// Needs a mostly-full gauge.
    DeepRelease,
}

impl BuffId {
    /// Trigger evaluation order.
    pub const ALL: [BuffId; 2] = [BuffId::ComboBoost, BuffId::DeepRelease];

    /// Identifier used by the `skills` content rows.
    pub fn as_str(self) -> &'static str {
        match self {
            BuffId::ComboBoost => "combo_boost",
            BuffId::DeepRelease => "deep_release",
        }
    }

    /// Additive bonus on top of the base 1.0 gain multiplier.
    pub fn gain_bonus(self) -> f64 {
        match self {
            BuffId::ComboBoost => 1.0,
            BuffId::DeepRelease => 2.0,
        }
    }

    pub fn min_combo(self) -> u32 {
        match self {
            BuffId::ComboBoost => 20,
            BuffId::DeepRelease => 0,
        }
    }

    pub fn min_gauge(self) -> f64 {
        match self {
            BuffId::ComboBoost => 50.0,
            BuffId::DeepRelease => 70.0,
        }
    }

    pub fn condition_met(self, combo: u32, relax_gauge: f64) -> bool {
        combo >= self.min_combo() && relax_gauge >= self.min_gauge()
    }
}

impl fmt::Display for BuffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuffId {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "combo_boost" => Ok(BuffId::ComboBoost),
            "deep_release" => Ok(BuffId::DeepRelease),
            _ => Err(ParseEnumError {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combo_boost_needs_streak_and_gauge() {
        assert!(!BuffId::ComboBoost.condition_met(19, 90.0));
        assert!(!BuffId::ComboBoost.condition_met(25, 49.9));
        assert!(BuffId::ComboBoost.condition_met(20, 50.0));
    }

    #[test]
    fn deep_release_ignores_combo() {
        assert!(BuffId::DeepRelease.condition_met(0, 70.0));
        assert!(!BuffId::DeepRelease.condition_met(100, 69.0));
    }
}

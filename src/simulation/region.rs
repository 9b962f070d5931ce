use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rules::ParseEnumError;

/// Body area that can be highlighted and clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Shoulder,
    Neck,
    Back,
    Waist,
    Thigh,
    Calf,
    Foot,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Region::Shoulder,
        Region::Neck,
        Region::Back,
        Region::Waist,
        Region::Thigh,
        Region::Calf,
        Region::Foot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Shoulder => "shoulder",
            Region::Neck => "neck",
            Region::Back => "back",
            Region::Waist => "waist",
            Region::Thigh => "thigh",
            Region::Calf => "calf",
            Region::Foot => "foot",
        }
    }

    pub fn is_upper_body(self) -> bool {
        matches!(self, Region::Shoulder | Region::Neck)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .iter()
            .copied()
            .find(|region| region.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                value: s.to_string(),
            })
    }
}

/// Accumulated gain per region. Every region is always present and never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionBalance(BTreeMap<Region, f64>);

impl Default for RegionBalance {
    fn default() -> Self {
        Self(Region::ALL.iter().map(|region| (*region, 0.0)).collect())
    }
}

impl RegionBalance {
    pub fn get(&self, region: Region) -> f64 {
        self.0.get(&region).copied().unwrap_or(0.0)
    }

    /// Adds a gain; negative or non-finite amounts are ignored.
    pub fn add(&mut self, region: Region, amount: f64) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        *self.0.entry(region).or_insert(0.0) += amount;
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Region, f64)> + '_ {
        self.0.iter().map(|(region, value)| (*region, *value))
    }

    /// Builds a balance from explicit values, filling the rest with zero.
    pub fn from_values(values: &[(Region, f64)]) -> Self {
        let mut balance = Self::default();
        for (region, value) in values {
            balance.add(*region, *value);
        }
        balance
    }
}

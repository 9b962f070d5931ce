use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rules::ParseEnumError;
use crate::simulation::region::{Region, RegionBalance};

pub const PRO_FINISH_COMBO: u32 = 60;
pub const UPPER_BODY_SHARE: f64 = 45.0;
pub const LOWER_BODY_SHARE: f64 = 55.0;
pub const EVEN_MAX_SHARE: f64 = 35.0;
pub const EVEN_MIN_SHARE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndingId {
    /// Light shoulders: the session concentrated on shoulder and neck.
    E1,
    /// Straight posture: the session concentrated on the lower body.
    E2,
    /// Whole-body tune-up, also the fallback.
    E3,
    /// Professional finish: a very long streak.
    E4,
}

impl EndingId {
    pub fn as_str(self) -> &'static str {
        match self {
            EndingId::E1 => "E1",
            EndingId::E2 => "E2",
            EndingId::E3 => "E3",
            EndingId::E4 => "E4",
        }
    }

    /// Scene id of the dialogue rows holding this ending's text.
    pub fn scene_id(self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for EndingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndingId {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "E1" => Ok(EndingId::E1),
            "E2" => Ok(EndingId::E2),
            "E3" => Ok(EndingId::E3),
            "E4" => Ok(EndingId::E4),
            _ => Err(ParseEnumError {
                value: s.to_string(),
            }),
        }
    }
}

/// Per-region share of the final balance, in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceShares {
    pub shares: Vec<(Region, f64)>,
}

impl BalanceShares {
    pub fn from_balance(balance: &RegionBalance) -> Self {
        let total = balance.total();
        let total = if total > 0.0 { total } else { 1.0 };
        let shares = Region::ALL
            .iter()
            .map(|region| (*region, balance.get(*region) / total * 100.0))
            .collect();
        Self { shares }
    }

    pub fn share(&self, region: Region) -> f64 {
        self.shares
            .iter()
            .find(|(r, _)| *r == region)
            .map(|(_, share)| *share)
            .unwrap_or(0.0)
    }

    pub fn upper_body(&self) -> f64 {
        self.sum_where(|region| region.is_upper_body())
    }

    pub fn lower_body(&self) -> f64 {
        self.sum_where(|region| !region.is_upper_body())
    }

    fn sum_where(&self, keep: impl Fn(Region) -> bool) -> f64 {
        self.shares
            .iter()
            .filter(|(region, _)| keep(*region))
            .map(|(_, share)| *share)
            .sum()
    }

    pub fn max_share(&self) -> f64 {
        self.shares
            .iter()
            .map(|(_, share)| *share)
            .fold(f64::MIN, f64::max)
    }

    pub fn min_share(&self) -> f64 {
        self.shares
            .iter()
            .map(|(_, share)| *share)
            .fold(f64::MAX, f64::min)
    }
}

/// Picks the ending for a finished session; the first matching rule wins.
pub fn resolve_ending(balance: &RegionBalance, combo: u32) -> EndingId {
    if combo >= PRO_FINISH_COMBO {
        return EndingId::E4;
    }

    let shares = BalanceShares::from_balance(balance);
    if shares.upper_body() >= UPPER_BODY_SHARE {
        return EndingId::E1;
    }
    if shares.lower_body() >= LOWER_BODY_SHARE {
        return EndingId::E2;
    }
    if shares.max_share() <= EVEN_MAX_SHARE && shares.min_share() >= EVEN_MIN_SHARE {
        return EndingId::E3;
    }

    EndingId::E3
}

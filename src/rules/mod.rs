pub mod combo;
pub mod ending;
pub mod gain;

use thiserror::Error;

pub use combo::{combo_multiplier, ComboRule};
pub use ending::{resolve_ending, BalanceShares, EndingId};
pub use gain::{gain, time_bonus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown enum value: {value}")]
pub struct ParseEnumError {
    pub value: String,
}

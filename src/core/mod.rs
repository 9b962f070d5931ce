pub mod config;
pub mod ecs;
pub mod game;
pub mod input;

pub use config::{AudioSettings, ComboMode, ConfigError, GameConfig};
pub use game::Game;
pub use input::{Input, RejectedInput};

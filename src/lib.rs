// Re-export core modules for use by the binary or other consumers
pub mod content;
pub mod core;
pub mod persistence;
pub mod rules;
pub mod simulation;
pub mod systems;
pub mod ui;

// Expose the game controller and the types needed to drive it
pub use crate::content::{ContentRepository, ContentTables};
pub use crate::core::{Game, GameConfig, Input, RejectedInput};
pub use crate::simulation::{Region, Screen, SessionState};
pub use crate::ui::{Notification, PresentationSink, RecordingSink};

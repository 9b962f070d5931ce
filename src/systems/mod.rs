pub mod buffs;
pub mod dialogue;
pub mod scheduler;
pub mod session;
pub mod target;

pub use dialogue::{DialogueMode, DialogueStep};
pub use scheduler::{FiredTimer, Scheduler, SessionTimers, TaskHandle, Timer};
pub use session::{Session, END_GRACE_MS};

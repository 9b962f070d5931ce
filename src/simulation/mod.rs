pub mod buff;
pub mod region;
pub mod session;
pub mod time;

pub use buff::BuffId;
pub use region::{Region, RegionBalance};
pub use session::{Screen, SessionState, Target, MAX_RELAX_GAUGE};
pub use time::Millis;

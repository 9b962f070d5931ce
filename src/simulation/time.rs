use bevy_ecs::prelude::*;

/// Monotonic timestamp or duration in milliseconds, as reported by the host clock.
pub type Millis = f64;

pub const MILLIS_PER_SECOND: Millis = 1000.0;

pub fn secs_to_millis(secs: f64) -> Millis {
    secs * MILLIS_PER_SECOND
}

/// Resource holding the session clock. It never runs backwards.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct GameClock {
    pub now: Millis,
}

impl GameClock {
    pub fn advance_to(&mut self, now: Millis) {
        self.now = self.now.max(now);
    }
}

/// Whole seconds left until `deadline`, rounded up and never negative.
pub fn remaining_secs(now: Millis, deadline: Millis) -> u32 {
    let left = (deadline - now).max(0.0);
    (left / MILLIS_PER_SECOND).ceil() as u32
}

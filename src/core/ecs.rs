use bevy_ecs::prelude::*;
use bevy_ecs::schedule::SystemSet;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::content::tables::ContentTables;
use crate::core::config::{ComboMode, GameConfig};
use crate::rules::combo::ComboRule;
use crate::simulation::session::SessionState;
use crate::simulation::time::GameClock;
use crate::systems::buffs::buff_timer_system;
use crate::systems::dialogue::dialogue_reveal_system;
use crate::systems::scheduler::{FiredTimer, Scheduler, SessionTimers};
use crate::systems::session::{
    clear_fired_timer_system, end_grace_system, input_system, ClickQueue, InputQueue, Lifecycle,
    TargetRng,
};
use crate::systems::target::{click_system, target_poll_system};
use crate::ui::sink::Outbox;

/// Canonical tick ordering. A tick carries either one input or one fired timer.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TickSet {
    Intake,
    Simulation,
    Cleanup,
}

/// Build the ECS world with the session resources.
pub fn create_world(config: GameConfig, content: ContentTables) -> World {
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let combo_rule = match config.combo_mode {
        ComboMode::Reaction => ComboRule::Reaction,
        ComboMode::Tempo => {
            let (window_min_secs, window_max_secs) = content.combo_window_secs();
            ComboRule::Tempo {
                window_min_secs,
                window_max_secs,
            }
        }
    };

    let mut world = World::new();
    world.insert_resource(config);
    world.insert_resource(content);
    world.insert_resource(combo_rule);
    world.insert_resource(TargetRng(rng));
    world.insert_resource(GameClock::default());
    world.insert_resource(Scheduler::new());
    world.insert_resource(SessionTimers::default());
    world.insert_resource(SessionState::new());
    world.insert_resource(Outbox::default());
    world.insert_resource(InputQueue::default());
    world.insert_resource(ClickQueue::default());
    world.insert_resource(FiredTimer::default());
    world.insert_resource(Lifecycle::default());
    world
}

/// Build the system schedule in the canonical order.
pub fn create_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.configure_sets((TickSet::Intake, TickSet::Simulation, TickSet::Cleanup).chain());

    schedule.add_systems((
        input_system.in_set(TickSet::Intake),
        (
            click_system,
            target_poll_system,
            dialogue_reveal_system,
            buff_timer_system,
            end_grace_system,
        )
            .chain()
            .in_set(TickSet::Simulation),
        clear_fired_timer_system.in_set(TickSet::Cleanup),
    ));

    schedule
}

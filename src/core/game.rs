use bevy_ecs::prelude::*;
use bevy_ecs::system::RunSystemOnce;
use chrono::Utc;
use tracing::{debug, warn};

use crate::content::tables::ContentTables;
use crate::core::config::{AudioSettings, GameConfig};
use crate::core::ecs::{create_schedule, create_world};
use crate::core::input::{Input, RejectedInput};
use crate::persistence::{AutosaveSnapshot, AutosaveStore};
use crate::simulation::session::{Screen, SessionState};
use crate::simulation::time::{GameClock, Millis};
use crate::systems::scheduler::{FiredTimer, Scheduler, SessionTimers, Timer};
use crate::systems::session::{reset_session_system, startup_system, InputQueue, Lifecycle};
use crate::ui::sink::{Outbox, PresentationSink};

/// Wrapper around the ECS world and schedule.
///
/// Every tick runs to completion before the next one starts. Time only moves
/// through [`Game::advance_to`] and [`Game::dispatch`], which fire due tasks
/// in order before handling the input.
pub struct Game<S: PresentationSink> {
    world: World,
    schedule: Schedule,
    sink: S,
    autosave: Option<Box<dyn AutosaveStore>>,
}

impl<S: PresentationSink> Game<S> {
    /// Builds the game on the title screen, or reports a startup failure when
    /// no content could be read at all.
    pub fn new(config: GameConfig, content: ContentTables, sink: S) -> Self {
        let mut world = create_world(config, content);
        world.run_system_once(startup_system);
        let mut game = Self {
            world,
            schedule: create_schedule(),
            sink,
            autosave: None,
        };
        game.flush();
        game
    }

    /// Saves a snapshot on the configured interval while the game screen is up.
    pub fn with_autosave(mut self, store: Box<dyn AutosaveStore>) -> Self {
        let now = self.now();
        let interval = self.world.resource::<GameConfig>().autosave_interval_ms;
        let previous = self.world.resource_mut::<Lifecycle>().autosave_task.take();
        let handle = {
            let mut scheduler = self.world.resource_mut::<Scheduler>();
            if let Some(previous) = previous {
                scheduler.cancel(previous);
            }
            scheduler.every(now, interval, Timer::Autosave)
        };
        self.world.resource_mut::<Lifecycle>().autosave_task = Some(handle);
        self.autosave = Some(store);
        self
    }

    pub fn state(&self) -> &SessionState {
        self.world.resource::<SessionState>()
    }

    pub fn content(&self) -> &ContentTables {
        self.world.resource::<ContentTables>()
    }

    pub fn audio(&self) -> &AudioSettings {
        &self.world.resource::<GameConfig>().audio
    }

    pub fn timers(&self) -> &SessionTimers {
        self.world.resource::<SessionTimers>()
    }

    pub fn pending_tasks(&self) -> usize {
        self.world.resource::<Scheduler>().len()
    }

    pub fn now(&self) -> Millis {
        self.world.resource::<GameClock>().now
    }

    pub fn is_closed(&self) -> bool {
        self.world.resource::<Lifecycle>().closed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Fires every task due at or before `now`, oldest first, one tick each.
    pub fn advance_to(&mut self, now: Millis) {
        if self.is_closed() {
            return;
        }
        loop {
            let Some(fired) = self.world.resource_mut::<Scheduler>().pop_due(now) else {
                break;
            };
            self.world.resource_mut::<GameClock>().advance_to(fired.due);
            if fired.timer == Timer::Autosave {
                self.autosave();
            } else {
                self.world.resource_mut::<FiredTimer>().0 = Some(fired.timer);
                self.schedule.run(&mut self.world);
            }
            self.flush();
            if self.is_closed() {
                return;
            }
        }
        self.world.resource_mut::<GameClock>().advance_to(now);
    }

    /// Handles one input at time `now`. A rejected input changes nothing.
    pub fn dispatch(&mut self, input: Input, now: Millis) -> Result<(), RejectedInput> {
        if self.is_closed() {
            return Err(RejectedInput::Closed);
        }
        self.advance_to(now);

        let name = input.name();
        self.world.resource_mut::<InputQueue>().input = Some(input);
        self.schedule.run(&mut self.world);
        let result = self
            .world
            .resource_mut::<InputQueue>()
            .outcome
            .take()
            .unwrap_or(Ok(()));

        match &result {
            Err(err) if err.is_invalid_input() => {
                warn!(input = name, error = %err, "invalid input ignored")
            }
            Err(err) => debug!(input = name, error = %err, "input rejected"),
            Ok(()) => {}
        }
        self.flush();
        result
    }

    /// Cancels every session task and returns to a fresh title screen.
    pub fn reset(&mut self) {
        self.world.run_system_once(reset_session_system);
        self.flush();
    }

    fn autosave(&mut self) {
        let state = self.world.resource::<SessionState>();
        if state.screen != Screen::Game {
            return;
        }
        let Some(store) = self.autosave.as_mut() else {
            return;
        };
        let snapshot = AutosaveSnapshot::capture(state, Utc::now());
        match store.save(&snapshot) {
            Ok(()) => debug!(gauge = snapshot.relax_gauge, "autosaved"),
            Err(err) => warn!(error = %err, "autosave failed"),
        }
    }

    fn flush(&mut self) {
        let sent = std::mem::take(&mut self.world.resource_mut::<Outbox>().0);
        for notification in &sent {
            self.sink.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::content::repository::{row, EntityType, MemoryContentRepository};
    use crate::persistence::AutosaveError;
    use crate::rules::ending::EndingId;
    use crate::simulation::region::Region;
    use crate::ui::notification::{MissReason, Notification};
    use crate::ui::sink::RecordingSink;

    fn content(base_gain: &str) -> ContentTables {
        let parts = Region::ALL
            .iter()
            .map(|region| row(&[("part_id", region.as_str()), ("base_gain", base_gain)]))
            .collect();
        let repo = MemoryContentRepository::new()
            .with_rows(
                EntityType::Characters,
                vec![row(&[("char_id", "koharu"), ("name", "Koharu")])],
            )
            .with_rows(
                EntityType::Dialogues,
                vec![row(&[
                    ("scene_id", "intro"),
                    ("char_id", "koharu"),
                    ("order", "1"),
                    ("text", "Hello"),
                ])],
            )
            .with_rows(
                EntityType::Scenes,
                vec![row(&[("scene_id", "therapy_room"), ("bg_image", "room.png")])],
            )
            .with_rows(EntityType::ClickAreas, parts);
        ContentTables::load(&repo)
    }

    fn game(base_gain: &str) -> Game<RecordingSink> {
        let config = GameConfig {
            seed: Some(3),
            ..GameConfig::default()
        };
        Game::new(config, content(base_gain), RecordingSink::new())
    }

    fn enter_game(game: &mut Game<RecordingSink>) {
        game.dispatch(Input::SelectCharacter("koharu".to_string()), 0.0)
            .unwrap();
        game.dispatch(Input::Start, 0.0).unwrap();
        game.dispatch(Input::AdvanceDialogue, 0.0).unwrap();
        assert_eq!(game.state().screen, Screen::Game);
    }

    fn click_target(game: &mut Game<RecordingSink>, at: Millis) -> Region {
        let region = game.state().current_target.unwrap().region;
        game.dispatch(Input::ClickRegion(region.as_str().to_string()), at)
            .unwrap();
        region
    }

    #[test]
    fn starts_on_title_screen() {
        let mut game = game("1");
        assert_eq!(
            game.sink_mut().take(),
            vec![Notification::ScreenChanged {
                screen: Screen::Title,
                background: None
            }]
        );
    }

    #[test]
    fn empty_content_reports_startup_failure() {
        let mut game = Game::new(
            GameConfig::default(),
            ContentTables::load(&MemoryContentRepository::new()),
            RecordingSink::new(),
        );
        let sent = game.sink_mut().take();
        assert!(matches!(sent.as_slice(), [Notification::StartupFailed { .. }]));
    }

    #[test]
    fn start_requires_a_character() {
        let mut game = game("1");
        let before = game.state().clone();
        assert_eq!(
            game.dispatch(Input::Start, 0.0),
            Err(RejectedInput::NoCharacterSelected)
        );
        assert_eq!(game.state(), &before);
        assert_eq!(
            game.dispatch(Input::SelectCharacter("nobody".to_string()), 0.0),
            Err(RejectedInput::UnknownCharacter("nobody".to_string()))
        );
        assert_eq!(game.state().selected_character, None);
    }

    #[test]
    fn dialogue_line_reveals_one_character_per_tick() {
        let mut game = game("1");
        game.dispatch(Input::SelectCharacter("koharu".to_string()), 0.0)
            .unwrap();
        game.dispatch(Input::Start, 0.0).unwrap();
        assert_eq!(game.state().screen, Screen::Dialog);
        let sent = game.sink_mut().take();
        assert!(sent.contains(&Notification::DialogueLine {
            speaker: "Koharu".to_string(),
            text: "Hello".to_string()
        }));

        game.advance_to(500.0);
        let reveals: Vec<usize> = game
            .sink_mut()
            .take()
            .into_iter()
            .filter_map(|n| match n {
                Notification::DialogueReveal { visible_chars } => Some(visible_chars),
                _ => None,
            })
            .collect();
        assert_eq!(reveals, vec![1, 2, 3, 4, 5]);
        assert!(game.timers().reveal.is_none());
    }

    #[test]
    fn finishing_dialogue_starts_target_loop() {
        let mut game = game("1");
        enter_game(&mut game);
        assert!(game.state().target_pending());
        assert!(game.timers().target_poll.is_some());
        let sent = game.sink_mut().take();
        assert!(sent.contains(&Notification::ScreenChanged {
            screen: Screen::Game,
            background: Some("room.png".to_string())
        }));
    }

    #[test]
    fn clicking_the_target_scores_and_moves_it() {
        let mut game = game("1");
        enter_game(&mut game);
        let region = click_target(&mut game, 0.0);
        assert_eq!(game.state().combo, 1);
        assert_eq!(game.state().relax_gauge, 1.0);
        assert_eq!(game.state().balance.get(region), 1.0);
        assert_ne!(game.state().current_target.unwrap().region, region);
    }

    #[test]
    fn wrong_region_and_unknown_region() {
        let mut game = game("1");
        enter_game(&mut game);
        click_target(&mut game, 100.0);
        let target = game.state().current_target.unwrap().region;
        let wrong = Region::ALL.iter().find(|r| **r != target).unwrap();
        game.dispatch(Input::ClickRegion(wrong.as_str().to_string()), 200.0)
            .unwrap();
        assert_eq!(game.state().combo, 0);
        assert_eq!(game.state().max_combo, 1);
        assert_eq!(game.state().miss_count, 1);

        let before = game.state().clone();
        assert_eq!(
            game.dispatch(Input::ClickRegion("elbow".to_string()), 200.0),
            Err(RejectedInput::UnknownRegion("elbow".to_string()))
        );
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn late_click_on_the_target_counts_as_a_timeout() {
        let mut game = game("1");
        enter_game(&mut game);
        click_target(&mut game, 0.0);
        assert_eq!(game.state().combo, 1);
        game.sink_mut().take();

        let late = click_target(&mut game, 3050.0);
        let state = game.state();
        assert_eq!(state.combo, 0);
        assert_eq!(state.max_combo, 1);
        assert_eq!(state.miss_count, 1);
        assert_eq!(state.balance.total(), 1.0);
        let next = state.current_target.unwrap();
        assert_ne!(next.region, late);
        assert_eq!(next.started_at, 3050.0);
        assert!(game.sink().notifications.contains(&Notification::Miss {
            region: Some(late),
            reason: MissReason::Timeout
        }));
    }

    #[test]
    fn unanswered_target_times_out_once() {
        let mut game = game("1");
        enter_game(&mut game);
        let first = game.state().current_target.unwrap().region;
        game.advance_to(3000.0);
        assert_eq!(game.state().miss_count, 0);
        game.advance_to(3100.0);
        assert_eq!(game.state().miss_count, 1);
        let next = game.state().current_target.unwrap();
        assert_ne!(next.region, first);
        assert_eq!(next.started_at, 3100.0);
    }

    #[test]
    fn full_gauge_ends_after_grace_delay() {
        let mut game = game("100");
        enter_game(&mut game);
        let region = click_target(&mut game, 0.0);
        assert!(game.state().completed);
        assert_eq!(game.state().current_target, None);
        assert_eq!(
            game.dispatch(Input::ClickRegion(region.as_str().to_string()), 10.0),
            Err(RejectedInput::NoPendingTarget)
        );

        game.advance_to(999.0);
        assert_eq!(game.state().screen, Screen::Game);
        game.advance_to(1000.0);
        assert_eq!(game.state().screen, Screen::Ending);
        let expected = if region.is_upper_body() {
            EndingId::E1
        } else {
            EndingId::E2
        };
        assert_eq!(game.state().ending, Some(expected));
        assert!(game.timers().is_idle());
    }

    #[test]
    fn retry_keeps_character_and_resets_everything_else() {
        let mut game = game("100");
        enter_game(&mut game);
        click_target(&mut game, 0.0);
        game.advance_to(1000.0);

        game.dispatch(Input::Retry, 1500.0).unwrap();
        let state = game.state();
        assert_eq!(state.screen, Screen::Game);
        assert_eq!(state.selected_character.as_deref(), Some("koharu"));
        assert_eq!(state.relax_gauge, 0.0);
        assert_eq!(state.max_combo, 0);
        assert_eq!(state.ending, None);
        assert!(state.target_pending());
    }

    #[test]
    fn return_to_title_from_ending_is_a_full_reset() {
        let mut game = game("100");
        enter_game(&mut game);
        click_target(&mut game, 0.0);
        game.advance_to(1000.0);

        game.dispatch(Input::ReturnToTitle, 1200.0).unwrap();
        assert_eq!(game.state(), &SessionState::new());
        assert!(game.timers().is_idle());
        assert!(game.state().current_target.is_none());
    }

    #[test]
    fn reset_mid_session_matches_a_fresh_state() {
        let mut game = game("1");
        enter_game(&mut game);
        click_target(&mut game, 0.0);
        game.sink_mut().take();
        game.reset();
        assert_eq!(game.state(), &SessionState::new());
        assert!(game.sink().notifications.contains(&Notification::ScreenChanged {
            screen: Screen::Title,
            background: None
        }));
        assert!(game.timers().is_idle());
        assert_eq!(game.pending_tasks(), 0);

        game.reset();
        assert_eq!(game.state(), &SessionState::new());
        game.advance_to(5000.0);
        assert_eq!(game.state().miss_count, 0);
    }

    #[test]
    fn inputs_on_the_wrong_screen_are_rejected() {
        let mut game = game("1");
        assert_eq!(
            game.dispatch(Input::Retry, 0.0),
            Err(RejectedInput::WrongScreen {
                input: "retry",
                screen: Screen::Title
            })
        );
        assert!(matches!(
            game.dispatch(Input::ClickRegion("neck".to_string()), 0.0),
            Err(RejectedInput::WrongScreen { .. })
        ));
    }

    #[test]
    fn config_screen_adjusts_volume() {
        let mut game = game("1");
        game.dispatch(Input::OpenConfig, 0.0).unwrap();
        assert_eq!(game.state().screen, Screen::Config);
        game.dispatch(
            Input::AdjustVolume {
                channel: "bgm".to_string(),
                value: 25,
            },
            0.0,
        )
        .unwrap();
        assert_eq!(game.audio().bgm, 0.25);
        assert_eq!(
            game.dispatch(
                Input::AdjustVolume {
                    channel: "bgm".to_string(),
                    value: 140,
                },
                0.0,
            ),
            Err(RejectedInput::VolumeOutOfRange(140))
        );
        assert_eq!(game.audio().bgm, 0.25);
        game.dispatch(Input::ReturnToTitle, 0.0).unwrap();
        assert_eq!(game.state().screen, Screen::Title);
    }

    #[test]
    fn volume_only_changes_on_the_config_screen() {
        let mut game = game("1");
        enter_game(&mut game);
        game.sink_mut().take();
        let before = *game.audio();
        assert_eq!(
            game.dispatch(
                Input::AdjustVolume {
                    channel: "bgm".to_string(),
                    value: 10,
                },
                10.0,
            ),
            Err(RejectedInput::WrongScreen {
                input: "adjust-volume",
                screen: Screen::Game
            })
        );
        assert_eq!(game.audio(), &before);
        assert_eq!(game.audio().bgm, 0.6);
        assert!(!game
            .sink()
            .notifications
            .iter()
            .any(|n| matches!(n, Notification::VolumeChanged { .. })));
    }

    #[test]
    fn exit_cancels_everything() {
        let mut game = game("1");
        enter_game(&mut game);
        game.dispatch(Input::Exit, 10.0).unwrap();
        assert!(game.is_closed());
        assert_eq!(game.pending_tasks(), 0);
        assert_eq!(game.dispatch(Input::Start, 20.0), Err(RejectedInput::Closed));
        assert_eq!(game.sink().notifications.last(), Some(&Notification::Exited));
    }

    struct SharedStore(Rc<RefCell<Vec<AutosaveSnapshot>>>);

    impl AutosaveStore for SharedStore {
        fn save(&mut self, snapshot: &AutosaveSnapshot) -> Result<(), AutosaveError> {
            self.0.borrow_mut().push(snapshot.clone());
            Ok(())
        }

        fn load_latest(&self) -> Result<Option<AutosaveSnapshot>, AutosaveError> {
            Ok(self.0.borrow().last().cloned())
        }
    }

    #[test]
    fn autosave_runs_only_during_play() {
        let saved = Rc::new(RefCell::new(Vec::new()));
        let mut game = game("1").with_autosave(Box::new(SharedStore(saved.clone())));
        game.advance_to(5000.0);
        assert!(saved.borrow().is_empty());

        game.dispatch(Input::SelectCharacter("koharu".to_string()), 6000.0)
            .unwrap();
        game.dispatch(Input::Start, 6000.0).unwrap();
        game.dispatch(Input::AdvanceDialogue, 6000.0).unwrap();
        click_target(&mut game, 6000.0);
        game.advance_to(10_000.0);

        let saved = saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].relax_gauge, 1.0);
        assert_eq!(saved[0].max_combo, 1);
    }
}

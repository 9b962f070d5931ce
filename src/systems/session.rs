use bevy_ecs::prelude::*;
use bevy_ecs::system::SystemParam;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::content::tables::ContentTables;
use crate::core::config::GameConfig;
use crate::core::input::{Input, RejectedInput};
use crate::rules::combo::ComboRule;
use crate::rules::ending::resolve_ending;
use crate::simulation::buff::BuffId;
use crate::simulation::region::Region;
use crate::simulation::session::{DialogueCursor, Screen, SessionState};
use crate::simulation::time::{GameClock, Millis};
use crate::systems::buffs::{self, BUFF_CUTIN_DELAY_MS};
use crate::systems::dialogue::{current_step, DialogueStep, REVEAL_CHAR_MS};
use crate::systems::scheduler::{
    BuffTimers, FiredTimer, RevealProgress, Scheduler, SessionTimers, TaskHandle, Timer,
};
use crate::systems::target::{clear_target, pick_region, push_status, set_target, TARGET_POLL_MS};
use crate::ui::notification::{Notification, SoundCue, VolumeChannel};
use crate::ui::sink::Outbox;

/// Pause between a full gauge and the ending screen.
pub const END_GRACE_MS: Millis = 1000.0;

/// Resource: random source for target selection.
#[derive(Resource)]
pub struct TargetRng(pub StdRng);

/// Resource storing the input for the next tick and what became of it.
#[derive(Resource, Default, Debug)]
pub struct InputQueue {
    pub input: Option<Input>,
    pub outcome: Option<Result<(), RejectedInput>>,
}

/// A click on the pending target's screen, waiting to be judged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub region: Region,
    pub at: Millis,
}

#[derive(Resource, Default, Debug)]
pub struct ClickQueue(pub Option<Click>);

/// Resource: application-scoped state that outlives session resets.
#[derive(Resource, Default, Debug)]
pub struct Lifecycle {
    pub closed: bool,
    pub autosave_task: Option<TaskHandle>,
}

/// Everything a session handler reads or writes.
#[derive(SystemParam)]
pub struct Session<'w> {
    pub state: ResMut<'w, SessionState>,
    pub timers: ResMut<'w, SessionTimers>,
    pub scheduler: ResMut<'w, Scheduler>,
    pub outbox: ResMut<'w, Outbox>,
    pub rng: ResMut<'w, TargetRng>,
    pub config: ResMut<'w, GameConfig>,
    pub content: Res<'w, ContentTables>,
    pub combo_rule: Res<'w, ComboRule>,
    pub clock: Res<'w, GameClock>,
}

impl Session<'_> {
    pub fn now(&self) -> Millis {
        self.clock.now
    }

    pub fn notify(&mut self, notification: Notification) {
        self.outbox.0.push(notification);
    }

    pub fn require_screen(
        &self,
        input: &'static str,
        allowed: &[Screen],
    ) -> Result<Screen, RejectedInput> {
        let screen = self.state.screen;
        if allowed.contains(&screen) {
            Ok(screen)
        } else {
            Err(RejectedInput::WrongScreen { input, screen })
        }
    }

    pub fn change_screen(&mut self, screen: Screen) {
        self.state.screen = screen;
        let background = self.content.background_for(screen.scene_id());
        debug!(screen = %screen, "screen changed");
        self.notify(Notification::ScreenChanged { screen, background });
    }

    pub fn push_hud(&mut self) {
        let gauge = self.state.relax_gauge;
        let combo = self.state.combo;
        self.notify(Notification::GaugeChanged(gauge));
        self.notify(Notification::ComboChanged(combo));
        push_status(&self.state, &mut self.outbox.0);
    }

    /// Cancels every session task and returns to a fresh title screen.
    pub fn reset(&mut self) {
        self.timers.cancel_all(&mut self.scheduler);
        self.state.reset();
        self.push_hud();
        self.change_screen(Screen::Title);
    }

    pub fn reset_keeping_character(&mut self) {
        let character = self.state.selected_character.take();
        self.timers.cancel_all(&mut self.scheduler);
        self.state.reset();
        self.state.selected_character = character;
        self.push_hud();
    }

    pub fn next_target(&mut self) {
        let previous = self.state.current_target.map(|target| target.region);
        let region = pick_region(&mut self.rng.0, previous);
        let now = self.now();
        set_target(&mut self.state, region, now, &mut self.outbox.0);
    }

    pub fn enter_game(&mut self) {
        self.timers.cancel_reveal(&mut self.scheduler);
        self.change_screen(Screen::Game);
        self.push_hud();

        let now = self.now();
        let region = pick_region(&mut self.rng.0, None);
        set_target(&mut self.state, region, now, &mut self.outbox.0);
        self.timers.cancel_target_poll(&mut self.scheduler);
        self.timers.target_poll = Some(self.scheduler.every(now, TARGET_POLL_MS, Timer::TargetPoll));
        debug!(region = %region, "target loop started");
    }

    /// Gauge is full: stop the target loop and wait out the grace delay.
    pub fn complete_session(&mut self) {
        self.state.completed = true;
        self.timers.cancel_target_poll(&mut self.scheduler);
        clear_target(&mut self.state, &mut self.outbox.0);
        let now = self.now();
        self.timers.end_grace = Some(self.scheduler.once(now, END_GRACE_MS, Timer::EndGrace));
        info!(
            max_combo = self.state.max_combo,
            misses = self.state.miss_count,
            "gauge full"
        );
    }

    pub fn schedule_cutin(&mut self, buff: BuffId) {
        self.timers.cancel_buff(&mut self.scheduler);
        let now = self.now();
        let cutin = self
            .scheduler
            .once(now, BUFF_CUTIN_DELAY_MS, Timer::BuffCutin(buff));
        self.timers.buff = Some(BuffTimers {
            buff,
            cutin: Some(cutin),
            tick: None,
            expire: None,
            expires_at: None,
        });
        info!(buff = %buff, "buff triggered");
    }

    pub fn show_dialogue(&mut self) {
        let step = current_step(
            &self.content,
            self.config.dialogue_mode,
            &self.state.dialogue_cursor,
            self.state.selected_character.as_deref(),
        );
        match step {
            DialogueStep::Line { speaker, text } => {
                let total_chars = text.chars().count();
                self.notify(Notification::DialogueLine { speaker, text });
                self.start_reveal(total_chars);
            }
            DialogueStep::Finished => self.enter_game(),
        }
    }

    fn start_reveal(&mut self, total_chars: usize) {
        self.timers.cancel_reveal(&mut self.scheduler);
        if total_chars == 0 {
            return;
        }
        let now = self.now();
        let handle = self.scheduler.every(now, REVEAL_CHAR_MS, Timer::DialogueReveal);
        self.timers.reveal = Some(RevealProgress {
            handle,
            total_chars,
            shown: 0,
        });
    }

    fn finish_session(&mut self) {
        self.timers.end_grace = None;
        self.timers.cancel_buff(&mut self.scheduler);
        self.state.cutin_buff = None;
        let active: Vec<BuffId> = self.state.active_buffs.iter().copied().collect();
        for buff in active {
            buffs::deactivate(&mut self.state, buff, &mut self.outbox.0);
        }

        let ending = resolve_ending(&self.state.balance, self.state.max_combo);
        self.state.ending = Some(ending);
        let title = self.content.ending_title(ending);
        let text = self.content.ending_text(ending);
        info!(ending = %ending, "session ended");
        self.notify(Notification::EndingResolved {
            ending,
            title,
            text,
        });
        self.notify(Notification::Sound(SoundCue::EndingChime));
        self.change_screen(Screen::Ending);
    }

    fn select_character(&mut self, char_id: String) -> Result<(), RejectedInput> {
        self.require_screen("select-character", &[Screen::Title])?;
        if !self.content.is_selectable_character(&char_id) {
            return Err(RejectedInput::UnknownCharacter(char_id));
        }
        let name = self.content.character_name(&char_id);
        self.state.selected_character = Some(char_id.clone());
        self.notify(Notification::CharacterSelected { char_id, name });
        Ok(())
    }

    fn start(&mut self) -> Result<(), RejectedInput> {
        self.require_screen("start", &[Screen::Title])?;
        let Some(character) = self.state.selected_character.clone() else {
            return Err(RejectedInput::NoCharacterSelected);
        };
        self.notify(Notification::Sound(SoundCue::ButtonClick));

        self.reset_keeping_character();
        self.state.dialogue_cursor = DialogueCursor {
            scene: self.config.intro_scene.clone(),
            index: 0,
        };
        info!(character = %character, "session started");
        self.change_screen(Screen::Dialog);
        self.show_dialogue();
        Ok(())
    }

    fn advance_dialogue(&mut self) -> Result<(), RejectedInput> {
        self.require_screen("advance-dialogue", &[Screen::Dialog])?;
        self.notify(Notification::Sound(SoundCue::ButtonClick));
        self.timers.cancel_reveal(&mut self.scheduler);
        self.state.dialogue_cursor.index += 1;
        self.show_dialogue();
        Ok(())
    }

    fn queue_click(&mut self, part: &str, clicks: &mut ClickQueue) -> Result<(), RejectedInput> {
        let region: Region = part
            .parse()
            .map_err(|_| RejectedInput::UnknownRegion(part.to_string()))?;
        self.require_screen("click-region", &[Screen::Game])?;
        if !self.state.target_pending() {
            return Err(RejectedInput::NoPendingTarget);
        }
        clicks.0 = Some(Click {
            region,
            at: self.now(),
        });
        Ok(())
    }

    fn retry(&mut self) -> Result<(), RejectedInput> {
        self.require_screen("retry", &[Screen::Ending])?;
        self.notify(Notification::Sound(SoundCue::ButtonClick));
        self.reset_keeping_character();
        self.enter_game();
        Ok(())
    }

    fn return_to_title(&mut self) -> Result<(), RejectedInput> {
        let from = self.require_screen("return-to-title", &[Screen::Ending, Screen::Config])?;
        self.notify(Notification::Sound(SoundCue::ButtonClick));
        if from == Screen::Ending {
            self.reset();
        } else {
            self.change_screen(Screen::Title);
        }
        Ok(())
    }

    fn open_config(&mut self) -> Result<(), RejectedInput> {
        self.require_screen("open-config", &[Screen::Title])?;
        self.notify(Notification::Sound(SoundCue::ButtonClick));
        self.change_screen(Screen::Config);
        Ok(())
    }

    fn adjust_volume(&mut self, channel: &str, value: i32) -> Result<(), RejectedInput> {
        self.require_screen("adjust-volume", &[Screen::Config])?;
        let channel = VolumeChannel::parse(channel)
            .ok_or_else(|| RejectedInput::UnknownChannel(channel.to_string()))?;
        if !(0..=100).contains(&value) {
            return Err(RejectedInput::VolumeOutOfRange(value));
        }
        self.config.audio.set_level(channel, value as f64 / 100.0);
        let level = self.config.audio.level(channel);
        self.notify(Notification::VolumeChanged { channel, level });
        Ok(())
    }

    fn exit(&mut self, lifecycle: &mut Lifecycle) {
        self.notify(Notification::Sound(SoundCue::ButtonClick));
        self.timers.cancel_all(&mut self.scheduler);
        if let Some(handle) = lifecycle.autosave_task.take() {
            self.scheduler.cancel(handle);
        }
        lifecycle.closed = true;
        self.notify(Notification::Exited);
        info!("game closed");
    }
}

/// One-shot: title screen, or a startup failure when no content loaded at all.
pub fn startup_system(mut session: Session) {
    if session.content.report.is_total_failure() {
        let reason = session.content.report.failure_summary();
        warn!(%reason, "no content could be loaded");
        session.notify(Notification::StartupFailed { reason });
    } else {
        session.change_screen(Screen::Title);
    }
}

/// One-shot: cancels every session task and returns to a fresh title screen.
pub fn reset_session_system(mut session: Session) {
    session.reset();
}

/// System: applies the queued input. Clicks are only validated here and
/// judged by the click system in the same tick.
pub fn input_system(
    mut queue: ResMut<InputQueue>,
    mut clicks: ResMut<ClickQueue>,
    mut lifecycle: ResMut<Lifecycle>,
    mut session: Session,
) {
    let Some(input) = queue.input.take() else {
        return;
    };
    let result = match input {
        Input::SelectCharacter(char_id) => session.select_character(char_id),
        Input::Start => session.start(),
        Input::AdvanceDialogue => session.advance_dialogue(),
        Input::ClickRegion(part) => session.queue_click(&part, &mut clicks),
        Input::Retry => session.retry(),
        Input::ReturnToTitle => session.return_to_title(),
        Input::OpenConfig => session.open_config(),
        Input::AdjustVolume { channel, value } => session.adjust_volume(&channel, value),
        Input::Exit => {
            session.exit(&mut lifecycle);
            Ok(())
        }
    };
    queue.outcome = Some(result);
}

/// System: switches to the ending screen once the grace delay is over.
pub fn end_grace_system(fired: Res<FiredTimer>, mut session: Session) {
    if fired.0 == Some(Timer::EndGrace) {
        session.finish_session();
    }
}

/// System: forgets the timer handled this tick.
pub fn clear_fired_timer_system(mut fired: ResMut<FiredTimer>) {
    fired.0 = None;
}

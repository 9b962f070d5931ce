use bevy_ecs::prelude::*;
use tracing::{debug, info};

use crate::simulation::buff::BuffId;
use crate::simulation::session::SessionState;
use crate::simulation::time::{remaining_secs, Millis};
use crate::systems::scheduler::{BuffTimers, FiredTimer, Timer};
use crate::systems::session::Session;
use crate::ui::notification::{Notification, SoundCue};

/// Delay between the cut-in and the buff taking effect.
pub const BUFF_CUTIN_DELAY_MS: Millis = 1000.0;
pub const BUFF_TICK_MS: Millis = 1000.0;

/// Checks the auto-trigger conditions after a hit.
///
/// Buffs are checked in [`BuffId::ALL`] order and each may fire once per
/// session. A buff whose condition holds while the slot is taken is marked
/// used without firing, so it is gone for the rest of the session.
/// Returns the buff that entered its cut-in, if any.
pub fn evaluate_triggers(state: &mut SessionState, out: &mut Vec<Notification>) -> Option<BuffId> {
    let mut triggered = None;
    for buff in BuffId::ALL {
        if state.used_buffs.contains(&buff) || !buff.condition_met(state.combo, state.relax_gauge) {
            continue;
        }
        state.used_buffs.insert(buff);
        if state.buff_slot_taken() {
            debug!(buff = %buff, "buff condition met while another buff holds the slot; forfeited");
            continue;
        }
        state.cutin_buff = Some(buff);
        out.push(Notification::BuffCutin(buff));
        out.push(Notification::Sound(SoundCue::SkillActivate));
        triggered = Some(buff);
    }
    triggered
}

/// Moves a buff from its cut-in to active. Returns false if the cut-in was superseded.
pub fn activate(
    state: &mut SessionState,
    buff: BuffId,
    duration_ms: Millis,
    out: &mut Vec<Notification>,
) -> bool {
    if state.cutin_buff != Some(buff) {
        return false;
    }
    state.cutin_buff = None;
    state.active_buffs.insert(buff);
    out.push(Notification::BuffActivated {
        buff,
        duration_ms: duration_ms.max(0.0).round() as u64,
    });
    true
}

pub fn deactivate(state: &mut SessionState, buff: BuffId, out: &mut Vec<Notification>) -> bool {
    if !state.active_buffs.remove(&buff) {
        return false;
    }
    out.push(Notification::BuffDeactivated(buff));
    true
}

/// System: runs the cut-in, countdown and expiry timers of the buff slot.
pub fn buff_timer_system(fired: Res<FiredTimer>, mut session: Session) {
    match fired.0 {
        Some(Timer::BuffCutin(buff)) => activate_after_cutin(&mut session, buff),
        Some(Timer::BuffTick(buff)) => countdown(&mut session, buff),
        Some(Timer::BuffExpire(buff)) => expire(&mut session, buff),
        _ => {}
    }
}

fn activate_after_cutin(session: &mut Session, buff: BuffId) {
    if session.timers.buff.map(|timers| timers.buff) != Some(buff) {
        return;
    }
    let duration = session.content.buff_duration_ms(buff);
    if !activate(&mut session.state, buff, duration, &mut session.outbox.0) {
        session.timers.cancel_buff(&mut session.scheduler);
        return;
    }
    let now = session.now();
    let expires_at = now + duration;
    let tick = session.scheduler.every(now, BUFF_TICK_MS, Timer::BuffTick(buff));
    let expiry = session.scheduler.once(now, duration, Timer::BuffExpire(buff));
    session.timers.buff = Some(BuffTimers {
        buff,
        cutin: None,
        tick: Some(tick),
        expire: Some(expiry),
        expires_at: Some(expires_at),
    });
    session.notify(Notification::BuffTick {
        buff,
        remaining_secs: remaining_secs(now, expires_at),
    });
}

fn countdown(session: &mut Session, buff: BuffId) {
    let Some(timers) = session.timers.buff.filter(|timers| timers.buff == buff) else {
        return;
    };
    let Some(expires_at) = timers.expires_at else {
        return;
    };
    let remaining = remaining_secs(session.now(), expires_at);
    if remaining > 0 {
        session.notify(Notification::BuffTick {
            buff,
            remaining_secs: remaining,
        });
    }
}

fn expire(session: &mut Session, buff: BuffId) {
    if session.timers.buff.map(|timers| timers.buff) == Some(buff) {
        session.timers.cancel_buff(&mut session.scheduler);
    }
    if deactivate(&mut session.state, buff, &mut session.outbox.0) {
        info!(buff = %buff, "buff ended");
    }
}

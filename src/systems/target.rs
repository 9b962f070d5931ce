use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::content::tables::ContentTables;
use crate::rules::combo::ComboRule;
use crate::rules::gain::{gain, REACTION_WINDOW_MS};
use crate::simulation::region::Region;
use crate::simulation::session::{SessionState, Target};
use crate::simulation::time::{Millis, MILLIS_PER_SECOND};
use crate::systems::buffs;
use crate::systems::scheduler::{FiredTimer, Timer};
use crate::systems::session::{ClickQueue, Session};
use crate::ui::notification::{MissReason, Notification, SoundCue};

/// How often a pending target is checked for timeout.
pub const TARGET_POLL_MS: Millis = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickVerdict {
    Hit { reaction_ms: Millis },
    Late,
    WrongRegion,
}

/// Uniform pick over all regions, skipping `previous` when another region exists.
pub fn pick_region<R: Rng + ?Sized>(rng: &mut R, previous: Option<Region>) -> Region {
    let candidates: Vec<Region> = Region::ALL
        .iter()
        .copied()
        .filter(|region| Region::ALL.len() == 1 || Some(*region) != previous)
        .collect();
    candidates
        .choose(rng)
        .copied()
        .unwrap_or(Region::ALL[0])
}

/// A click exactly at the window edge still counts as a hit.
pub fn classify_click(target: &Target, clicked: Region, at: Millis) -> ClickVerdict {
    if clicked != target.region {
        return ClickVerdict::WrongRegion;
    }
    let reaction_ms = target.elapsed(at);
    if reaction_ms <= REACTION_WINDOW_MS {
        ClickVerdict::Hit { reaction_ms }
    } else {
        ClickVerdict::Late
    }
}

pub fn is_timed_out(target: &Target, now: Millis) -> bool {
    target.elapsed(now) > REACTION_WINDOW_MS
}

pub fn set_target(state: &mut SessionState, region: Region, now: Millis, out: &mut Vec<Notification>) {
    state.current_target = Some(Target {
        region,
        started_at: now,
    });
    out.push(Notification::TargetChanged(Some(region)));
}

pub fn clear_target(state: &mut SessionState, out: &mut Vec<Notification>) {
    if state.current_target.take().is_some() {
        out.push(Notification::TargetChanged(None));
    }
}

/// Any miss zeroes the streak and counts once.
pub fn register_miss(
    state: &mut SessionState,
    region: Option<Region>,
    reason: MissReason,
    out: &mut Vec<Notification>,
) {
    state.combo = 0;
    state.miss_count = state.miss_count.saturating_add(1);
    out.push(Notification::Miss { region, reason });
    out.push(Notification::ComboChanged(state.combo));
    push_status(state, out);
}

/// Scores a timely hit and returns the gain applied.
pub fn register_hit(
    state: &mut SessionState,
    content: &ContentTables,
    rule: &ComboRule,
    region: Region,
    reaction_ms: Millis,
    at: Millis,
    out: &mut Vec<Notification>,
) -> f64 {
    let since_last_hit = state
        .last_hit_at
        .map(|last| (at - last) / MILLIS_PER_SECOND);
    state.combo = rule.next_combo(state.combo, since_last_hit);
    state.max_combo = state.max_combo.max(state.combo);
    state.last_hit_at = Some(at);

    let amount = gain(
        content.base_gain(region),
        state.combo,
        &state.active_buffs,
        reaction_ms,
    );
    state.balance.add(region, amount);
    state.add_relax(amount);

    out.push(Notification::Hit {
        region,
        gain: amount,
    });
    out.push(Notification::Sound(SoundCue::ClickSoft));
    out.push(Notification::GaugeChanged(state.relax_gauge));
    out.push(Notification::ComboChanged(state.combo));
    push_status(state, out);
    amount
}

pub fn push_status(state: &SessionState, out: &mut Vec<Notification>) {
    out.push(Notification::StatusChanged {
        combo: state.combo,
        max_combo: state.max_combo,
        miss_count: state.miss_count,
    });
}

/// System: judges the queued click. A late click on the right region counts
/// as a timeout.
pub fn click_system(mut clicks: ResMut<ClickQueue>, mut session: Session) {
    let Some(click) = clicks.0.take() else {
        return;
    };
    let Some(target) = session.state.current_target else {
        return;
    };

    match classify_click(&target, click.region, click.at) {
        ClickVerdict::Hit { reaction_ms } => {
            register_hit(
                &mut session.state,
                &session.content,
                &session.combo_rule,
                click.region,
                reaction_ms,
                click.at,
                &mut session.outbox.0,
            );
            if session.state.gauge_full() {
                session.complete_session();
                return;
            }
            if let Some(buff) = buffs::evaluate_triggers(&mut session.state, &mut session.outbox.0) {
                session.schedule_cutin(buff);
            }
            session.next_target();
        }
        ClickVerdict::Late => {
            register_miss(
                &mut session.state,
                Some(click.region),
                MissReason::Timeout,
                &mut session.outbox.0,
            );
            session.next_target();
        }
        ClickVerdict::WrongRegion => {
            register_miss(
                &mut session.state,
                Some(click.region),
                MissReason::WrongRegion,
                &mut session.outbox.0,
            );
            session.next_target();
        }
    }
}

/// System: turns an unanswered target into a timeout miss and moves on.
pub fn target_poll_system(fired: Res<FiredTimer>, mut session: Session) {
    if fired.0 != Some(Timer::TargetPoll) || !session.state.target_pending() {
        return;
    }
    let Some(target) = session.state.current_target else {
        return;
    };
    if is_timed_out(&target, session.now()) {
        register_miss(
            &mut session.state,
            Some(target.region),
            MissReason::Timeout,
            &mut session.outbox.0,
        );
        session.next_target();
    }
}

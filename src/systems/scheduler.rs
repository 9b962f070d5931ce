use bevy_ecs::prelude::*;

use crate::simulation::buff::BuffId;
use crate::simulation::time::Millis;

/// Work the game performs when a scheduled task comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    TargetPoll,
    BuffCutin(BuffId),
    BuffTick(BuffId),
    BuffExpire(BuffId),
    EndGrace,
    DialogueReveal,
    Autosave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiredTask {
    pub handle: TaskHandle,
    pub due: Millis,
    pub timer: Timer,
}

#[derive(Debug, Clone)]
struct Entry {
    handle: TaskHandle,
    due: Millis,
    period: Option<Millis>,
    timer: Timer,
}

const MIN_PERIOD_MS: Millis = 1.0;

/// Cancellable one-shot and periodic tasks on a caller-driven clock.
///
/// Tasks fire in due order; tasks due at the same instant fire in the order
/// they were first scheduled. A cancelled task never fires.
#[derive(Resource, Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn once(&mut self, now: Millis, delay: Millis, timer: Timer) -> TaskHandle {
        self.push(now + delay.max(0.0), None, timer)
    }

    /// First run one `period` after `now`.
    pub fn every(&mut self, now: Millis, period: Millis, timer: Timer) -> TaskHandle {
        let period = period.max(MIN_PERIOD_MS);
        self.push(now + period, Some(period), timer)
    }

    /// Returns whether the task was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        before != self.entries.len()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.earliest().map(|idx| self.entries[idx].due)
    }

    /// Removes and returns the earliest task due at or before `until`.
    /// Periodic tasks are re-armed one period after their due time.
    pub fn pop_due(&mut self, until: Millis) -> Option<FiredTask> {
        let idx = self.earliest()?;
        if self.entries[idx].due > until {
            return None;
        }

        let entry = &self.entries[idx];
        let fired = FiredTask {
            handle: entry.handle,
            due: entry.due,
            timer: entry.timer,
        };
        let period = entry.period;
        match period {
            Some(period) => self.entries[idx].due += period,
            None => {
                self.entries.swap_remove(idx);
            }
        }
        Some(fired)
    }

    fn push(&mut self, due: Millis, period: Option<Millis>, timer: Timer) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        self.entries.push(Entry {
            handle,
            due,
            period,
            timer,
        });
        handle
    }

    fn earliest(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.handle.cmp(&b.handle)))
            .map(|(idx, _)| idx)
    }
}

/// Timer that came due this tick; cleared once the tick is over.
#[derive(Resource, Debug, Default)]
pub struct FiredTimer(pub Option<Timer>);

/// Handles of every task that belongs to one buff run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuffTimers {
    pub buff: BuffId,
    pub cutin: Option<TaskHandle>,
    pub tick: Option<TaskHandle>,
    pub expire: Option<TaskHandle>,
    pub expires_at: Option<Millis>,
}

/// Typewriter progress of the dialogue line on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealProgress {
    pub handle: TaskHandle,
    pub total_chars: usize,
    pub shown: usize,
}

/// Every task tied to the current session, cancelled together.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SessionTimers {
    pub target_poll: Option<TaskHandle>,
    pub end_grace: Option<TaskHandle>,
    pub buff: Option<BuffTimers>,
    pub reveal: Option<RevealProgress>,
}

impl SessionTimers {
    pub fn cancel_target_poll(&mut self, scheduler: &mut Scheduler) {
        if let Some(handle) = self.target_poll.take() {
            scheduler.cancel(handle);
        }
    }

    pub fn cancel_reveal(&mut self, scheduler: &mut Scheduler) {
        if let Some(reveal) = self.reveal.take() {
            scheduler.cancel(reveal.handle);
        }
    }

    pub fn cancel_buff(&mut self, scheduler: &mut Scheduler) {
        if let Some(buff) = self.buff.take() {
            for handle in [buff.cutin, buff.tick, buff.expire].into_iter().flatten() {
                scheduler.cancel(handle);
            }
        }
    }

    pub fn cancel_all(&mut self, scheduler: &mut Scheduler) {
        self.cancel_target_poll(scheduler);
        self.cancel_reveal(scheduler);
        self.cancel_buff(scheduler);
        if let Some(handle) = self.end_grace.take() {
            scheduler.cancel(handle);
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

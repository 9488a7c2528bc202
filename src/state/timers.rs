//! Deterministic timers.
//!
//! Every suspension point of a round is a task on this scheduler: clock
//! ticks, the tournament countdown, delayed premove replay and the delayed
//! confirmation prompt. The host drives it with `Round::poll(now)`; nothing
//! here reads the wall clock.

use std::time::{Duration, Instant};

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Logical completion token for a board update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettleToken(pub u64);

/// Work a timer performs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    ClockTick,
    CorrespondenceTick,
    TournamentTick,
    /// Replay the queued premove once the board update `after` has settled.
    PremoveReplay { after: SettleToken },
    /// Show the confirmation prompt for the pending action `token`.
    ConfirmPrompt { token: u64 },
}

impl Task {
    pub fn is_interval(&self) -> bool {
        matches!(
            self,
            Self::ClockTick | Self::CorrespondenceTick | Self::TournamentTick
        )
    }
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    due: Instant,
    every: Option<Duration>,
    task: Task,
}

/// Single-threaded timer queue.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    timers: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once, `delay` after `now`.
    pub fn schedule_once(&mut self, now: Instant, delay: Duration, task: Task) -> TimerId {
        self.push(now + delay, None, task)
    }

    /// Run `task` every `interval`, first at `now + interval`.
    pub fn schedule_every(&mut self, now: Instant, interval: Duration, task: Task) -> TimerId {
        self.push(now + interval, Some(interval), task)
    }

    fn push(&mut self, due: Instant, every: Option<Duration>, task: Task) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timers.push(Timer {
            id,
            due,
            every,
            task,
        });
        id
    }

    /// Cancel a timer. Returns false if it was not scheduled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Cancel every timer whose task matches.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&Task) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| !pred(&t.task));
        before - self.timers.len()
    }

    /// Take the earliest task due at `now`, re-arming intervals.
    ///
    /// Ties fire in scheduling order.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, Task)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.id.0))
            .map(|(i, _)| i)?;

        let fired = (self.timers[idx].id, self.timers[idx].task);
        match self.timers[idx].every {
            Some(every) => self.timers[idx].due += every,
            None => {
                self.timers.remove(idx);
            }
        }
        Some(fired)
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn has_task(&self, mut pred: impl FnMut(&Task) -> bool) -> bool {
        self.timers.iter().any(|t| pred(&t.task))
    }

    pub fn interval_count(&self) -> usize {
        self.timers.iter().filter(|t| t.every.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

/// Leading-edge throttle: the first call in each window passes.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether a call at `now` may go through. Records it if so.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

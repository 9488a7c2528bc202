//! Clock synchronization.
//!
//! A round has at most one clock: a real-time clock ticking on a short
//! interval, or a correspondence clock ticking on a coarse one. The variant
//! is fixed when the round is built. Server snapshots overwrite the
//! remaining times outright; local ticks only count down between them.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::config::RoundConfig;
use super::timers::{Task, Throttle};
use super::types::Color;

/// Real-time clock as sent in a game snapshot. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockData {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub initial: u32,
    #[serde(default)]
    pub increment: u32,
    pub white: f64,
    pub black: f64,
}

/// Correspondence clock as sent in a game snapshot. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrespondenceData {
    pub days_per_turn: u32,
    #[serde(default)]
    pub increment: u32,
    pub white: f64,
    pub black: f64,
}

/// Remaining times pushed with a move. Seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub white: f64,
    pub black: f64,
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or_default()
}

/// Two countdowns anchored at the last sync or tick.
#[derive(Debug, Clone)]
struct Countdown {
    white: Duration,
    black: Duration,
    anchor: Instant,
}

impl Countdown {
    fn new(white: f64, black: f64, now: Instant) -> Self {
        Self {
            white: secs(white),
            black: secs(black),
            anchor: now,
        }
    }

    fn set(&mut self, white: f64, black: f64, now: Instant) {
        self.white = secs(white);
        self.black = secs(black);
        self.anchor = now;
    }

    fn get(&self, color: Color) -> Duration {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// Count `color` down by the time since the anchor. Returns whether it
    /// is out of time.
    fn tick(&mut self, color: Color, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.anchor);
        self.anchor = now;
        let remaining = match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        *remaining = remaining.saturating_sub(elapsed);
        remaining.is_zero()
    }

    fn touch(&mut self, now: Instant) {
        self.anchor = now;
    }
}

/// Low-latency clock for real-time games.
#[derive(Debug, Clone)]
pub struct RealTimeClock {
    times: Countdown,
    /// Clock was running in the last full snapshot.
    pub running: bool,
    pub initial: u32,
    pub increment: u32,
}

impl RealTimeClock {
    pub fn new(data: &ClockData, now: Instant) -> Self {
        Self {
            times: Countdown::new(data.white, data.black, now),
            running: data.running,
            initial: data.initial,
            increment: data.increment,
        }
    }

    pub fn remaining(&self, color: Color) -> Duration {
        self.times.get(color)
    }

    pub fn to_data(&self) -> ClockData {
        ClockData {
            running: self.running,
            initial: self.initial,
            increment: self.increment,
            white: self.times.white.as_secs_f64(),
            black: self.times.black.as_secs_f64(),
        }
    }
}

/// Remaining correspondence time broken down for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTime {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

/// Long-period clock for correspondence games.
#[derive(Debug, Clone)]
pub struct CorrespondenceClock {
    times: Countdown,
    pub days_per_turn: u32,
    pub increment: u32,
}

impl CorrespondenceClock {
    pub fn new(data: &CorrespondenceData, now: Instant) -> Self {
        Self {
            times: Countdown::new(data.white, data.black, now),
            days_per_turn: data.days_per_turn,
            increment: data.increment,
        }
    }

    pub fn remaining(&self, color: Color) -> Duration {
        self.times.get(color)
    }

    pub fn to_data(&self) -> CorrespondenceData {
        CorrespondenceData {
            days_per_turn: self.days_per_turn,
            increment: self.increment,
            white: self.times.white.as_secs_f64(),
            black: self.times.black.as_secs_f64(),
        }
    }

    /// Remaining time in whole days, hours and minutes.
    pub fn day_time(&self, color: Color) -> DayTime {
        let total = chrono::Duration::from_std(self.remaining(color))
            .unwrap_or_else(|_| chrono::Duration::zero());
        DayTime {
            days: total.num_days(),
            hours: total.num_hours() % 24,
            minutes: total.num_minutes() % 60,
        }
    }
}

/// The active clock strategy.
#[derive(Debug, Clone)]
pub enum ClockKind {
    RealTime(RealTimeClock),
    Correspondence(CorrespondenceClock),
    Untimed,
}

/// Owns the round's clock. Other components submit snapshots, they never
/// touch the countdowns directly.
#[derive(Debug, Clone)]
pub struct ClockSync {
    kind: ClockKind,
    /// `None` for spectators, who never flag anyone.
    out_of_time: Option<Throttle>,
}

impl ClockSync {
    /// Pick the clock variant from the snapshot. A real-time clock wins if
    /// both are present.
    pub fn new(
        clock: Option<&ClockData>,
        correspondence: Option<&CorrespondenceData>,
        spectator: bool,
        config: &RoundConfig,
        now: Instant,
    ) -> Self {
        let kind = match (clock, correspondence) {
            (Some(data), _) => ClockKind::RealTime(RealTimeClock::new(data, now)),
            (None, Some(data)) => ClockKind::Correspondence(CorrespondenceClock::new(data, now)),
            (None, None) => ClockKind::Untimed,
        };
        let out_of_time = (!spectator).then(|| Throttle::new(config.signal_throttle()));
        Self { kind, out_of_time }
    }

    pub fn kind(&self) -> &ClockKind {
        &self.kind
    }

    pub fn is_real_time(&self) -> bool {
        matches!(self.kind, ClockKind::RealTime(_))
    }

    pub fn is_correspondence(&self) -> bool {
        matches!(self.kind, ClockKind::Correspondence(_))
    }

    pub fn is_timed(&self) -> bool {
        !matches!(self.kind, ClockKind::Untimed)
    }

    pub fn real_time(&self) -> Option<&RealTimeClock> {
        match &self.kind {
            ClockKind::RealTime(c) => Some(c),
            _ => None,
        }
    }

    pub fn correspondence(&self) -> Option<&CorrespondenceClock> {
        match &self.kind {
            ClockKind::Correspondence(c) => Some(c),
            _ => None,
        }
    }

    pub fn remaining(&self, color: Color) -> Option<Duration> {
        match &self.kind {
            ClockKind::RealTime(c) => Some(c.remaining(color)),
            ClockKind::Correspondence(c) => Some(c.remaining(color)),
            ClockKind::Untimed => None,
        }
    }

    /// Interval and task of the periodic tick, if the clock needs one.
    pub fn tick_schedule(&self, config: &RoundConfig) -> Option<(Duration, Task)> {
        match self.kind {
            ClockKind::RealTime(_) => Some((config.clock_tick(), Task::ClockTick)),
            ClockKind::Correspondence(_) => {
                Some((config.correspondence_tick(), Task::CorrespondenceTick))
            }
            ClockKind::Untimed => None,
        }
    }

    /// Overwrite both remaining times with server values.
    pub fn update(&mut self, snapshot: ClockSnapshot, now: Instant) {
        match &mut self.kind {
            ClockKind::RealTime(c) => c.times.set(snapshot.white, snapshot.black, now),
            ClockKind::Correspondence(c) => c.times.set(snapshot.white, snapshot.black, now),
            ClockKind::Untimed => {}
        }
    }

    /// Apply a full real-time snapshot, including its running flag.
    pub fn sync_real_time(&mut self, data: &ClockData, now: Instant) {
        if let ClockKind::RealTime(c) = &mut self.kind {
            c.times.set(data.white, data.black, now);
            c.running = data.running;
        }
    }

    /// Start a correspondence clock if the round is still untimed.
    ///
    /// Returns whether one was created. An existing clock is never replaced.
    pub fn adopt_correspondence(&mut self, data: &CorrespondenceData, now: Instant) -> bool {
        if self.is_timed() {
            return false;
        }
        self.kind = ClockKind::Correspondence(CorrespondenceClock::new(data, now));
        true
    }

    /// Count down the side to move when `running`; otherwise just
    /// re-anchor so a paused clock loses no time. Returns whether an
    /// out-of-time signal should be sent now.
    pub fn tick(&mut self, color: Color, running: bool, now: Instant) -> bool {
        let times = match &mut self.kind {
            ClockKind::RealTime(c) => &mut c.times,
            ClockKind::Correspondence(c) => &mut c.times,
            ClockKind::Untimed => return false,
        };
        if !running {
            times.touch(now);
            return false;
        }
        let flagged = times.tick(color, now);
        flagged
            && self
                .out_of_time
                .as_mut()
                .is_some_and(|throttle| throttle.try_fire(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn realtime(white: f64, black: f64, spectator: bool, now: Instant) -> ClockSync {
        let data = ClockData {
            running: true,
            initial: 180,
            increment: 2,
            white,
            black,
        };
        ClockSync::new(Some(&data), None, spectator, &RoundConfig::default(), now)
    }

    #[test]
    fn test_variant_selection() {
        let t0 = Instant::now();
        let config = RoundConfig::default();
        let corres = CorrespondenceData {
            days_per_turn: 3,
            increment: 0,
            white: 259200.0,
            black: 259200.0,
        };

        assert!(realtime(60.0, 60.0, false, t0).is_real_time());
        let c = ClockSync::new(None, Some(&corres), false, &config, t0);
        assert!(c.is_correspondence());
        assert_eq!(c.tick_schedule(&config), Some((ms(6000), Task::CorrespondenceTick)));

        let untimed = ClockSync::new(None, None, false, &config, t0);
        assert!(!untimed.is_timed());
        assert_eq!(untimed.tick_schedule(&config), None);
    }

    #[test]
    fn test_tick_counts_down_side_to_move() {
        let t0 = Instant::now();
        let mut clock = realtime(10.0, 10.0, false, t0);

        assert!(!clock.tick(Color::White, true, t0 + ms(300)));
        assert_eq!(clock.remaining(Color::White), Some(ms(9700)));
        assert_eq!(clock.remaining(Color::Black), Some(ms(10000)));
    }

    #[test]
    fn test_tick_when_not_running_keeps_time() {
        let t0 = Instant::now();
        let mut clock = realtime(10.0, 10.0, false, t0);

        for i in 1..=5 {
            clock.tick(Color::White, false, t0 + ms(100 * i));
        }
        assert_eq!(clock.remaining(Color::White), Some(ms(10000)));
        assert_eq!(clock.remaining(Color::Black), Some(ms(10000)));

        // the paused time is not charged once it starts running
        clock.tick(Color::White, true, t0 + ms(600));
        assert_eq!(clock.remaining(Color::White), Some(ms(9900)));
    }

    #[test]
    fn test_update_overwrites() {
        let t0 = Instant::now();
        let mut clock = realtime(10.0, 10.0, false, t0);
        clock.tick(Color::White, true, t0 + ms(2000));

        clock.update(ClockSnapshot { white: 42.5, black: 7.0 }, t0 + ms(2100));
        assert_eq!(clock.remaining(Color::White), Some(ms(42500)));
        assert_eq!(clock.remaining(Color::Black), Some(ms(7000)));
    }

    #[test]
    fn test_out_of_time_is_throttled() {
        let t0 = Instant::now();
        let mut clock = realtime(0.2, 10.0, false, t0);

        assert!(!clock.tick(Color::White, true, t0 + ms(100)));
        assert!(clock.tick(Color::White, true, t0 + ms(200)));
        assert!(!clock.tick(Color::White, true, t0 + ms(300)));
        assert!(!clock.tick(Color::White, true, t0 + ms(600)));
        assert!(clock.tick(Color::White, true, t0 + ms(700)));
        assert_eq!(clock.remaining(Color::White), Some(Duration::ZERO));
    }

    #[test]
    fn test_spectator_never_flags() {
        let t0 = Instant::now();
        let mut clock = realtime(0.1, 10.0, true, t0);
        for i in 1..=10 {
            assert!(!clock.tick(Color::White, true, t0 + ms(100 * i)));
        }
    }

    #[test]
    fn test_correspondence_adopted_once() {
        let t0 = Instant::now();
        let config = RoundConfig::default();
        let data = CorrespondenceData {
            days_per_turn: 2,
            increment: 0,
            white: 90000.0,
            black: 3600.0,
        };

        let mut untimed = ClockSync::new(None, None, false, &config, t0);
        assert!(untimed.adopt_correspondence(&data, t0));
        assert!(!untimed.adopt_correspondence(&data, t0));

        let mut rt = realtime(1.0, 1.0, false, t0);
        assert!(!rt.adopt_correspondence(&data, t0));
        assert!(rt.is_real_time());
    }

    #[test]
    fn test_day_time() {
        let t0 = Instant::now();
        let data = CorrespondenceData {
            days_per_turn: 3,
            increment: 0,
            white: (2 * 86400 + 5 * 3600 + 7 * 60) as f64,
            black: 59.0,
        };
        let clock = CorrespondenceClock::new(&data, t0);
        assert_eq!(
            clock.day_time(Color::White),
            DayTime {
                days: 2,
                hours: 5,
                minutes: 7
            }
        );
        assert_eq!(
            clock.day_time(Color::Black),
            DayTime {
                days: 0,
                hours: 0,
                minutes: 0
            }
        );
    }
}

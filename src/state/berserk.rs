//! Berserk tracking.

use std::time::{Duration, Instant};

use super::timers::Throttle;
use super::types::Color;

/// Per-color berserk flags plus the throttle on the outbound signal.
///
/// Flags only ever go from false to true and reflect server confirmation;
/// the local signal is sent optimistically and does not touch them.
#[derive(Debug, Clone)]
pub struct BerserkTracker {
    white: bool,
    black: bool,
    signal: Throttle,
}

impl BerserkTracker {
    pub fn new(white: bool, black: bool, throttle: Duration) -> Self {
        Self {
            white,
            black,
            signal: Throttle::new(throttle),
        }
    }

    pub fn is_berserk(&self, color: Color) -> bool {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// Record a confirmed berserk. Returns false if it was already set.
    pub fn set(&mut self, color: Color) -> bool {
        let flag = match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        !std::mem::replace(flag, true)
    }

    /// Whether the outbound signal may be sent at `now`.
    pub fn try_signal(&mut self, now: Instant) -> bool {
        self.signal.try_fire(now)
    }
}

//! Round configuration.
//!
//! Timer cadences and the board integration switches. Every field has a
//! default, so an empty JSON object is a valid configuration.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
}

/// Tunables for one round.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Real-time clock tick interval (default: 100ms).
    pub clock_tick_ms: u64,
    /// Correspondence clock tick interval (default: 6s).
    pub correspondence_tick_ms: u64,
    /// Tournament countdown interval (default: 1s).
    pub tournament_tick_ms: u64,
    /// Wait before replaying a premove after an opponent move (default: 10ms).
    pub premove_delay_ms: u64,
    /// Same, for variants whose captures destroy neighbouring pieces
    /// (default: 100ms).
    pub cascading_premove_delay_ms: u64,
    /// Throttle window for `berserk` and `outoftime` (default: 500ms).
    pub signal_throttle_ms: u64,
    /// The board animates castling itself, so no rook delta is sent.
    pub auto_castle_handled_externally: bool,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            clock_tick_ms: 100,
            correspondence_tick_ms: 6000,
            tournament_tick_ms: 1000,
            premove_delay_ms: 10,
            cascading_premove_delay_ms: 100,
            signal_throttle_ms: 500,
            auto_castle_handled_externally: false,
        }
    }
}

impl RoundConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("clock_tick_ms", self.clock_tick_ms),
            ("correspondence_tick_ms", self.correspondence_tick_ms),
            ("tournament_tick_ms", self.tournament_tick_ms),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { field });
            }
        }
        Ok(())
    }

    pub fn clock_tick(&self) -> Duration {
        Duration::from_millis(self.clock_tick_ms)
    }

    pub fn correspondence_tick(&self) -> Duration {
        Duration::from_millis(self.correspondence_tick_ms)
    }

    pub fn tournament_tick(&self) -> Duration {
        Duration::from_millis(self.tournament_tick_ms)
    }

    pub fn signal_throttle(&self) -> Duration {
        Duration::from_millis(self.signal_throttle_ms)
    }

    /// Delay between an opponent move landing and the premove replay.
    pub fn premove_delay(&self, cascading_capture: bool) -> Duration {
        if cascading_capture {
            Duration::from_millis(self.cascading_premove_delay_ms)
        } else {
            Duration::from_millis(self.premove_delay_ms)
        }
    }
}

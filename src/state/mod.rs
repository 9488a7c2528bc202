//! State management for one live round.
//!
//! This module provides the round aggregate and the pieces it is built from:
//!
//! - `history` - Ply history and the viewing cursor
//! - `reconcile` - Applying authoritative move events
//! - `submission` - Submit-then-confirm workflow for user moves
//! - `premove` - Queued premove/predrop and its delayed replay
//! - `clock` - Real-time and correspondence clocks
//! - `berserk` - Per-color berserk flags
//! - `timers` - Deterministic scheduler driving every delayed task
//! - `round` - The controller tying them together
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                              Round<H: Host>                              │
//! │                                                                          │
//! │  server event ──▶ apply_move ──┬──▶ PlyHistory (steps + cursor)          │
//! │                                ├──▶ GameMeta (turn, status, dests)       │
//! │                                ├──▶ ClockSync (snapshot overwrite)       │
//! │                                └──▶ PremoveReplay (arm behind token)     │
//! │                                                                          │
//! │  user gesture ──▶ MoveSubmission ──▶ send now │ await confirm            │
//! │                                                                          │
//! │  poll(now) ──▶ Scheduler ──▶ clock tick │ tournament tick │               │
//! │                              premove replay │ confirm prompt            │
//! │                                                                          │
//! │                        take_effects() ──▶ Vec<Effect>                    │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here performs I/O or reads the wall clock on its own. Every entry
//! point takes `now` where time matters, and every side effect is returned
//! as an [`Effect`] for the host to carry out.
//!
//! # Usage
//!
//! ```rust,ignore
//! use round_state::state::{GameData, Round, RoundConfig};
//!
//! let data = GameData::from_json(&body)?;
//! let mut round = Round::new(data, RoundConfig::default(), host, Instant::now())?;
//!
//! round.apply_move(event, Instant::now());
//! for effect in round.take_effects() {
//!     host.perform(effect);
//! }
//! ```

pub mod berserk;
pub mod clock;
pub mod config;
pub mod effects;
pub mod event;
pub mod history;
pub mod host;
pub mod meta;
pub mod premove;
pub mod reconcile;
pub mod round;
pub mod snapshot;
pub mod submission;
pub mod timers;
pub mod types;

// Re-export commonly used types
pub use berserk::BerserkTracker;
pub use clock::{
    ClockData, ClockKind, ClockSnapshot, ClockSync, CorrespondenceClock, CorrespondenceData,
    DayTime, RealTimeClock,
};
pub use config::{ConfigError, RoundConfig};
pub use effects::{BoardCommand, BoardConfig, Effect, Listener, MoveConfig, PieceDelta, Sound};
pub use event::{
    Castle, ClientMessage, DropPayload, Enpassant, MoveEvent, MovePayload, Outbound, Promotion,
    SendOptions,
};
pub use history::{steps_hash, HistoryError, JumpDirection, PlyHistory, Step};
pub use host::{drop_allowed, Host};
pub use meta::{GameInfo, GameMeta, GameStatus, PlayerSide, Pref, TournamentInfo, Variant};
pub use premove::{PremoveReplay, Queued};
pub use round::{Round, RoundError};
pub use snapshot::{GameData, OfflineSnapshot, SnapshotError};
pub use submission::{MoveSubmission, PendingAction, SubmissionState};
pub use timers::{Scheduler, SettleToken, Task, Throttle, TimerId};
pub use types::{Color, Dests, Piece, Role, Speed, Square, Uci, UciError, VariantKey};

//! Round State Library
//!
//! This crate provides the client-side state core of a live two-player
//! board game round.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Ply History** - Every position of the game plus a cursor that can
//!   browse old plies without losing the live position.
//!
//! - **Move Reconciliation** - Applies authoritative server moves, derives
//!   board deltas (en passant, castling, promotion) and legal destinations.
//!
//! - **Move Submission** - Sends user moves at once, or holds them until the
//!   user confirms.
//!
//! - **Premove Replay** - Replays a queued premove or predrop once the
//!   opponent's move has settled on the board.
//!
//! - **Clocks** - Real-time and correspondence clocks kept in step with the
//!   server, with a throttled out-of-time signal.
//!
//! # Design Principles
//!
//! 1. **Effects, not I/O** - Every operation records what the host must do
//!    (board commands, sounds, outbound messages) and returns nothing to
//!    await.
//!
//! 2. **Explicit time** - Timers live in a deterministic scheduler driven by
//!    `Round::poll(now)`.
//!
//! 3. **Server truth wins** - Out of sequence events force a reload instead
//!    of being patched in.
//!
//! 4. **Serialization-ready** - Snapshots, events and outbound messages use
//!    the server's JSON shapes.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use round_state::{Effect, GameData, Host, MoveEvent, Round, RoundConfig};
//!
//! struct Device;
//!
//! impl Host for Device {
//!     fn has_network(&self) -> bool {
//!         true
//!     }
//! }
//!
//! let body = r#"{
//!     "game": { "id": "abcd1234", "player": "white", "status": { "id": 20, "name": "started" } },
//!     "player": { "color": "white" },
//!     "opponent": { "color": "black" },
//!     "steps": [{ "ply": 0, "fen": "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1" }]
//! }"#;
//! let data = GameData::from_json(body).unwrap();
//! let now = Instant::now();
//! let mut round = Round::new(data, RoundConfig::default(), Device, now).unwrap();
//! round.take_effects();
//!
//! let event: MoveEvent = serde_json::from_str(
//!     r#"{ "ply": 1, "fen": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
//!          "san": "e4", "uci": "e2e4", "isMove": true }"#,
//! )
//! .unwrap();
//! round.apply_move(event, now);
//!
//! assert_eq!(round.history().last_ply(), 1);
//! assert!(round.take_effects().iter().any(|e| matches!(e, Effect::Board(_))));
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;

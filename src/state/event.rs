//! Wire messages.
//!
//! The authoritative move event pushed by the server, and the client
//! messages this crate asks the transport to send.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::clock::ClockSnapshot;
use super::meta::GameStatus;
use super::types::{Color, Role, Square};

/// Pawn captured en passant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enpassant {
    pub key: Square,
    pub color: Color,
}

/// King and rook squares of a castling move, `[from, to]` each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Castle {
    pub king: [Square; 2],
    pub rook: [Square; 2],
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub key: Square,
    pub piece_class: Role,
}

/// One authoritative game-progress event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEvent {
    pub ply: u32,
    pub fen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub san: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uci: Option<String>,
    #[serde(default)]
    pub check: bool,
    /// A move (`true`) or a drop (`false`).
    #[serde(default = "default_true")]
    pub is_move: bool,
    /// Dropped role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Color>,
    #[serde(default, rename = "wDraw")]
    pub w_draw: bool,
    #[serde(default, rename = "bDraw")]
    pub b_draw: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dests: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drops: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crazyhouse: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enpassant: Option<Enpassant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub castle: Option<Castle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<ClockSnapshot>,
    #[serde(default)]
    pub threefold: bool,
}

fn default_true() -> bool {
    true
}

impl MoveEvent {
    /// Side that made this move.
    pub fn mover(&self) -> Color {
        Color::moved_at(self.ply)
    }

    /// Side to move afterwards.
    pub fn turn(&self) -> Color {
        Color::to_move_at(self.ply)
    }

    pub fn draw_offer(&self, color: Color) -> bool {
        match color {
            Color::White => self.w_draw,
            Color::Black => self.b_draw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePayload {
    /// Origin and destination squares plus optional promotion suffix.
    pub u: String,
}

impl MovePayload {
    pub fn new(orig: Square, dest: Square, promotion: Option<Role>) -> Self {
        let mut u = format!("{}{}", orig, dest);
        if let Some(role) = promotion {
            u.push(role.promotion_suffix());
        }
        Self { u }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropPayload {
    pub role: Role,
    pub pos: Square,
}

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "t", content = "d", rename_all = "lowercase")]
pub enum ClientMessage {
    Move(MovePayload),
    Drop(DropPayload),
    Berserk,
    #[serde(rename = "outoftime")]
    OutOfTime,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Drop(_) => "drop",
            Self::Berserk => "berserk",
            Self::OutOfTime => "outoftime",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Delivery flags passed to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Retransmit until acknowledged.
    pub ackable: bool,
    /// Attach lag-compensation data.
    pub with_lag: bool,
}

/// A message and how to send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub message: ClientMessage,
    pub options: SendOptions,
}

impl Outbound {
    pub fn plain(message: ClientMessage) -> Self {
        Self {
            message,
            options: SendOptions::default(),
        }
    }
}

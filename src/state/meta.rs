//! Game metadata.
//!
//! Players, colors, variant, status and the legality data the server pushes
//! for the side to move. Updated in place as authoritative fields arrive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{Color, Speed, VariantKey};

/// Server status codes.
pub mod status {
    pub const CREATED: u16 = 10;
    pub const STARTED: u16 = 20;
    pub const ABORTED: u16 = 25;
    pub const MATE: u16 = 30;
    pub const RESIGN: u16 = 31;
    pub const STALEMATE: u16 = 32;
    pub const TIMEOUT: u16 = 33;
    pub const DRAW: u16 = 34;
    pub const OUT_OF_TIME: u16 = 35;
    pub const CHEAT: u16 = 36;
    pub const NO_START: u16 = 37;
    pub const UNKNOWN_FINISH: u16 = 38;
    pub const VARIANT_END: u16 = 60;
}

/// Game status as sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    pub id: u16,
    pub name: String,
}

impl GameStatus {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn started() -> Self {
        Self::new(status::STARTED, "started")
    }

    pub fn is_started(&self) -> bool {
        self.id >= status::STARTED
    }

    pub fn is_aborted(&self) -> bool {
        self.id == status::ABORTED
    }

    /// Ended with a result (not aborted).
    pub fn is_finished(&self) -> bool {
        self.id >= status::MATE
    }

    /// Moves can still be played.
    pub fn is_playable(&self) -> bool {
        self.id < status::ABORTED
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        Self::new(status::CREATED, "created")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub key: VariantKey,
}

/// Game-level fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub id: String,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub speed: Speed,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Color>,
    /// Plies played so far.
    #[serde(default)]
    pub turns: u32,
    /// Side to move.
    pub player: Color,
    /// Ply at which the clock started counting.
    #[serde(default)]
    pub started_at_turn: u32,
    #[serde(default)]
    pub threefold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<String>,
    /// Position the board is initialised with.
    #[serde(default)]
    pub fen: String,
}

/// One side of the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSide {
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub spectator: bool,
    #[serde(default)]
    pub berserk: bool,
    #[serde(default)]
    pub offering_draw: bool,
    /// Has moved at least once.
    #[serde(default)]
    pub on_game: bool,
    /// Socket version the round was served at.
    #[serde(default)]
    pub version: u32,
}

impl PlayerSide {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            user_id: None,
            spectator: false,
            berserk: false,
            offering_draw: false,
            on_game: false,
            version: 0,
        }
    }
}

/// Per-game preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pref {
    /// Moves wait for explicit confirmation before they are sent.
    #[serde(default)]
    pub submit_move: bool,
    /// Board animation duration in milliseconds.
    #[serde(default)]
    pub animation_duration: u64,
}

/// Tournament the game belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentInfo {
    pub id: String,
    #[serde(default)]
    pub seconds_to_finish: u32,
}

/// Everything known about the game apart from its steps and clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMeta {
    pub game: GameInfo,
    /// The local viewer's side (the bottom side when spectating).
    pub player: PlayerSide,
    pub opponent: PlayerSide,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_moves: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possible_drops: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crazyhouse: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament: Option<TournamentInfo>,
    #[serde(default)]
    pub pref: Pref,
}

impl GameMeta {
    pub fn is_playable(&self) -> bool {
        self.game.status.is_playable()
    }

    /// The local viewer plays in this game and it is still running.
    pub fn is_player_playing(&self) -> bool {
        self.is_playable() && !self.player.spectator
    }

    pub fn is_player_turn(&self) -> bool {
        self.is_player_playing() && self.game.player == self.player.color
    }

    pub fn is_correspondence(&self) -> bool {
        self.game.speed.is_correspondence()
    }

    pub fn side(&self, color: Color) -> &PlayerSide {
        if self.player.color == color {
            &self.player
        } else {
            &self.opponent
        }
    }

    pub fn side_mut(&mut self, color: Color) -> &mut PlayerSide {
        if self.player.color == color {
            &mut self.player
        } else {
            &mut self.opponent
        }
    }

    /// Mark `color` as having moved at least once.
    pub fn set_on_game(&mut self, color: Color, on_game: bool) {
        self.side_mut(color).on_game = on_game;
    }

    /// Plies elapsed since the clock started.
    pub fn plies_since_clock_start(&self) -> u32 {
        self.game.turns.saturating_sub(self.game.started_at_turn)
    }
}

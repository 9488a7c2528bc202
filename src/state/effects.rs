//! Effects emitted by a round.
//!
//! Rounds never perform I/O. Every dispatch returns the effects the host
//! must carry out, in order: board instructions, feedback, outbound
//! messages, persistence and listener bookkeeping.

use std::collections::BTreeMap;

use super::event::Outbound;
use super::snapshot::OfflineSnapshot;
use super::submission::PendingAction;
use super::timers::SettleToken;
use super::types::{Color, Dests, Piece, Role, Square};

/// Full board configuration, used when jumping between plies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub fen: String,
    pub last_move: Option<Vec<Square>>,
    pub check: bool,
    pub turn_color: Color,
    /// Only set while live.
    pub movable_color: Option<Color>,
    /// Only set while live.
    pub dests: Option<Dests>,
}

/// Configuration applied together with a server move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveConfig {
    pub turn_color: Color,
    /// Legal destinations for the local player, empty otherwise.
    pub dests: Dests,
    pub check: bool,
}

/// Square deltas applied alongside a move; `None` empties the square.
pub type PieceDelta = BTreeMap<Square, Option<Piece>>;

/// Instructions for the board widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    Set(BoardConfig),
    /// Cancel any drag or selection, used while browsing history.
    Stop,
    /// Play a server move. The board reports nothing back; `token`
    /// identifies the update so dependent work can be ordered after it.
    ApiMove {
        orig: Square,
        dest: Square,
        pieces: PieceDelta,
        config: MoveConfig,
        token: SettleToken,
    },
    /// Place a dropped piece.
    NewPiece {
        piece: Piece,
        square: Square,
        config: MoveConfig,
        token: SettleToken,
    },
    Promote {
        square: Square,
        role: Role,
    },
    /// Destroy the pieces around `square` (cascading-capture variants).
    Explode {
        square: Square,
    },
    PlayPremove {
        orig: Square,
        dest: Square,
    },
    PlayPredrop {
        role: Role,
        square: Square,
    },
    /// Re-initialise from a reloaded snapshot.
    Reload {
        fen: String,
        turn_color: Color,
        dests: Dests,
    },
}

/// Sound categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Move,
    Capture,
    Explosion,
    /// Draw offer received.
    Dong,
    Berserk,
}

/// Host-level listeners a round subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// App returned to the foreground.
    Resume,
    /// A matchmaking seek was cancelled.
    SeekCanceled,
}

/// Something the host must do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Board(BoardCommand),
    Sound(Sound),
    /// Short haptic pulse.
    Vibrate,
    Send(Outbound),
    /// Tell the user a move needs a network connection.
    ConnectivityWarning,
    /// Fetch a fresh snapshot and hand it to `Round::reload`.
    Reload,
    SessionRefresh,
    SaveOffline(Box<OfflineSnapshot>),
    /// Show the confirm/cancel prompt for a pending action.
    ShowConfirm(PendingAction),
    HideConfirm,
    /// Route the back button to `Round::cancel_move`.
    PushBackHandler,
    PopBackHandler,
    Listen(Listener),
    Unlisten(Listener),
    ConnectSocket,
    KeepAwake,
    /// Seconds left in the tournament.
    TournamentCountdown(u32),
}

impl Effect {
    pub fn board(&self) -> Option<&BoardCommand> {
        match self {
            Self::Board(cmd) => Some(cmd),
            _ => None,
        }
    }

    pub fn sent(&self) -> Option<&Outbound> {
        match self {
            Self::Send(out) => Some(out),
            _ => None,
        }
    }
}

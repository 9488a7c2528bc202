//! Queries a round makes of its host.
//!
//! Everything the round needs to *ask* goes through this trait; everything
//! it needs to *do* is returned as an [`Effect`](super::effects::Effect).

use super::meta::GameMeta;
use super::types::{parse_possible_drops, Role, Square};

/// Host environment.
pub trait Host {
    /// Whether the device currently has network connectivity.
    fn has_network(&self) -> bool;

    /// Whether dropping `role` on `square` is allowed right now.
    fn is_valid_drop(&self, meta: &GameMeta, role: Role, square: Square) -> bool {
        drop_allowed(meta, role, square)
    }
}

/// Default drop rule.
///
/// Drops need a drop variant and the local player's turn. Pawns never land
/// on the first or last rank. When the server sent a drop list, the square
/// must be in it.
pub fn drop_allowed(meta: &GameMeta, role: Role, square: Square) -> bool {
    if !meta.game.variant.key.has_drops() || !meta.is_player_turn() {
        return false;
    }
    if role == Role::Pawn && square.is_back_rank() {
        return false;
    }
    match meta.possible_drops.as_deref() {
        Some(drops) => parse_possible_drops(drops).contains(&square),
        None => true,
    }
}

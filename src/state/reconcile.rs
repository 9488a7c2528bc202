//! Applying authoritative move events.

use std::time::Instant;

use tracing::{debug, warn};

use super::effects::{BoardCommand, Effect, MoveConfig, PieceDelta, Sound};
use super::event::MoveEvent;
use super::history::Step;
use super::host::Host;
use super::round::Round;
use super::snapshot::OfflineSnapshot;
use super::timers::SettleToken;
use super::types::{Color, Piece, Role, Square, Uci};

/// What kind of board update an event carries, validated up front.
enum Played {
    Move { orig: Square, dest: Square },
    Drop { role: Role, square: Square },
}

impl Played {
    fn from_event(event: &MoveEvent) -> Option<Self> {
        let uci = Uci::parse(event.uci.as_deref()?).ok()?;
        if event.is_move {
            uci.orig.map(|orig| Self::Move {
                orig,
                dest: uci.dest,
            })
        } else {
            event.role.map(|role| Self::Drop {
                role,
                square: uci.dest,
            })
        }
    }
}

impl<H: Host> Round<H> {
    /// Reconcile one server move or drop into the local state.
    ///
    /// An event that does not extend the history by exactly one ply is not
    /// applied; a full reload is requested instead. The same goes for a live
    /// event whose move cannot be read, since the board could not follow it.
    pub fn apply_move(&mut self, event: MoveEvent, now: Instant) {
        if let Err(err) = self.history.check_extends(event.ply) {
            warn!(game = %self.meta.game.id, %err, "out of sequence move, reloading");
            self.effects.push(Effect::Reload);
            return;
        }
        let was_live = self.history.is_live();
        let played = if was_live {
            let Some(played) = Played::from_event(&event) else {
                warn!(game = %self.meta.game.id, ply = event.ply, uci = ?event.uci, "unreadable move, reloading");
                self.effects.push(Effect::Reload);
                return;
            };
            Some(played)
        } else {
            None
        };
        let mover = event.mover();

        self.meta.game.turns = event.ply;
        self.meta.game.player = event.turn();
        if let Some(status) = event.status.clone() {
            self.meta.game.status = status;
        }
        if event.winner.is_some() {
            self.meta.game.winner = event.winner;
        }

        for color in [Color::White, Color::Black] {
            let offered = event.draw_offer(color);
            let side = self.meta.side_mut(color);
            let fresh = offered && !side.offering_draw;
            side.offering_draw = offered;
            if fresh {
                debug!(%color, "draw offered");
                self.effects.push(Effect::Sound(Sound::Dong));
                self.effects.push(Effect::Vibrate);
            }
        }

        if self.meta.player.color == self.meta.game.player {
            self.meta.possible_moves = event.dests.clone();
            self.meta.possible_drops = event.drops.clone();
        } else {
            self.meta.possible_moves = None;
            self.meta.possible_drops = None;
        }
        self.meta.crazyhouse = event.crazyhouse.clone();

        let settle = played.map(|played| self.play_on_board(&event, &played, mover));

        if let Some(clock) = event.clock {
            self.clock.update(clock, now);
        }
        self.meta.game.threefold = event.threefold;

        let step = Step {
            ply: event.ply,
            fen: event.fen,
            san: event.san,
            uci: event.uci,
            check: event.check,
            crazy: event.crazyhouse,
        };
        if let Err(err) = self.history.append(step) {
            // Sequence was checked above.
            warn!(%err, "append failed, reloading");
            self.effects.push(Effect::Reload);
            return;
        }
        if was_live {
            self.history.go_live();
        }
        self.meta.set_on_game(mover, true);
        debug!(ply = event.ply, %mover, live = was_live, "move applied");

        if let Some(token) = settle {
            if mover != self.meta.player.color {
                self.schedule_premove_replay(token, now);
            }
        }

        if self.meta.is_correspondence() {
            self.effects.push(Effect::SessionRefresh);
            self.effects
                .push(Effect::SaveOffline(Box::new(OfflineSnapshot::new(self.snapshot()))));
        }
    }

    /// Emit the board update for a live event. Returns its settle token.
    fn play_on_board(
        &mut self,
        event: &MoveEvent,
        played: &Played,
        mover: Color,
    ) -> SettleToken {
        let mut pieces = PieceDelta::new();

        if let Some(ep) = event.enpassant {
            pieces.insert(ep.key, None);
            if self.meta.game.variant.key.has_cascading_capture() {
                self.effects
                    .push(Effect::Board(BoardCommand::Explode { square: ep.key }));
                self.effects.push(Effect::Sound(Sound::Explosion));
            } else {
                self.effects.push(Effect::Sound(Sound::Capture));
            }
        }

        if let Some(castle) = event.castle {
            if !self.config.auto_castle_handled_externally {
                pieces.insert(castle.king[0], None);
                pieces.insert(castle.rook[0], None);
                pieces.insert(
                    castle.king[1],
                    Some(Piece {
                        role: Role::King,
                        color: castle.color,
                    }),
                );
                pieces.insert(
                    castle.rook[1],
                    Some(Piece {
                        role: Role::Rook,
                        color: castle.color,
                    }),
                );
            }
        }

        let config = MoveConfig {
            turn_color: self.meta.game.player,
            dests: self.player_dests(),
            check: event.check,
        };
        let token = self.next_settle_token();
        let command = match *played {
            Played::Move { orig, dest } => BoardCommand::ApiMove {
                orig,
                dest,
                pieces,
                config,
                token,
            },
            Played::Drop { role, square } => BoardCommand::NewPiece {
                piece: Piece { role, color: mover },
                square,
                config,
                token,
            },
        };
        self.effects.push(Effect::Board(command));

        if let Some(promotion) = event.promotion {
            self.effects.push(Effect::Board(BoardCommand::Promote {
                square: promotion.key,
                role: promotion.piece_class,
            }));
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::clock::{ClockData, ClockSnapshot};
    use crate::state::config::RoundConfig;
    use crate::state::event::{Castle, Enpassant, Promotion};
    use crate::state::meta::tests::make_meta;
    use crate::state::snapshot::GameData;
    use crate::state::types::VariantKey;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::time::Duration;

    struct Online;

    impl Host for Online {
        fn has_network(&self) -> bool {
            true
        }
    }

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    fn make_round(player: Color, first: u32, count: u32, now: Instant) -> Round<Online> {
        let steps = (first..first + count)
            .map(|ply| Step::new(ply, format!("fen-{}", ply)))
            .collect();
        let data = GameData {
            meta: make_meta(player),
            steps,
            clock: None,
            correspondence: None,
        };
        let mut round = Round::new(data, RoundConfig::default(), Online, now).unwrap();
        round.take_effects();
        round
    }

    fn move_event(ply: u32, uci: &str) -> MoveEvent {
        MoveEvent {
            ply,
            fen: format!("fen-{}", ply),
            san: Some(format!("m{}", ply)),
            uci: Some(uci.to_string()),
            is_move: true,
            ..Default::default()
        }
    }

    fn board_moves(effects: &[Effect]) -> Vec<&BoardCommand> {
        effects
            .iter()
            .filter_map(Effect::board)
            .filter(|c| {
                matches!(
                    c,
                    BoardCommand::ApiMove { .. } | BoardCommand::NewPiece { .. }
                )
            })
            .collect()
    }

    #[test]
    fn test_live_move_updates_board() {
        let now = Instant::now();
        let mut round = make_round(Color::Black, 0, 1, now);
        let mut event = move_event(1, "e2e4");
        event.dests = Some(BTreeMap::from([("e7".to_string(), "e6e5".to_string())]));
        round.apply_move(event, now);

        assert_eq!(round.history().last_ply(), 1);
        assert!(round.history().is_live());
        assert_eq!(round.meta().game.player, Color::Black);
        assert_eq!(round.meta().game.turns, 1);
        assert!(round.meta().opponent.on_game);

        let effects = round.take_effects();
        let moves = board_moves(&effects);
        assert_eq!(moves.len(), 1);
        let BoardCommand::ApiMove {
            orig, dest, config, ..
        } = moves[0]
        else {
            panic!("expected api move");
        };
        assert_eq!((*orig, *dest), (sq("e2"), sq("e4")));
        assert_eq!(config.turn_color, Color::Black);
        assert_eq!(config.dests.get(&sq("e7")), Some(&vec![sq("e6"), sq("e5")]));
    }

    #[test]
    fn test_browsing_keeps_cursor() {
        let now = Instant::now();
        let mut round = make_round(Color::White, 0, 3, now);
        assert!(round.jump(0));
        round.take_effects();

        round.apply_move(move_event(3, "g8f6"), now);
        assert_eq!(round.history().current_ply(), 0);
        assert_eq!(round.history().last_ply(), 3);
        assert!(board_moves(&round.take_effects()).is_empty());
        assert_eq!(round.meta().game.player, Color::Black);

        assert!(round.jump(3));
        assert_eq!(round.history().current().uci.as_deref(), Some("g8f6"));
    }

    #[test]
    fn test_sequence_violation_requests_reload() {
        let now = Instant::now();
        let mut round = make_round(Color::White, 0, 2, now);
        round.apply_move(move_event(5, "e2e4"), now);
        assert_eq!(round.take_effects(), vec![Effect::Reload]);
        assert_eq!(round.history().last_ply(), 1);
        assert_eq!(round.meta().game.turns, 0);

        round.apply_move(move_event(1, "e2e4"), now);
        assert_eq!(round.take_effects(), vec![Effect::Reload]);
    }

    #[test]
    fn test_unreadable_move_requests_reload() {
        let now = Instant::now();
        let mut round = make_round(Color::White, 0, 1, now);
        let mut event = move_event(1, "e2e4");
        event.uci = None;
        round.apply_move(event, now);
        assert_eq!(round.take_effects(), vec![Effect::Reload]);

        let mut drop = move_event(1, "N@f3");
        drop.is_move = false;
        round.apply_move(drop, now);
        assert_eq!(round.take_effects(), vec![Effect::Reload]);
        assert_eq!(round.history().len(), 1);
    }

    #[test]
    fn test_browsing_accepts_event_without_move() {
        let now = Instant::now();
        let mut round = make_round(Color::White, 0, 2, now);
        assert!(round.jump(0));
        round.take_effects();

        let mut event = move_event(2, "e7e5");
        event.uci = None;
        round.apply_move(event, now);
        assert!(!round.take_effects().contains(&Effect::Reload));
        assert_eq!(round.history().last_ply(), 2);
        assert_eq!(round.history().at(2).and_then(|s| s.uci.as_deref()), None);
        assert_eq!(round.history().current_ply(), 0);
    }

    fn clocked_round(now: Instant) -> Round<Online> {
        let data = GameData {
            meta: make_meta(Color::White),
            steps: vec![Step::new(0, "fen-0"), Step::new(1, "fen-1")],
            clock: Some(ClockData {
                running: true,
                initial: 60,
                increment: 0,
                white: 60.0,
                black: 60.0,
            }),
            correspondence: None,
        };
        let mut round = Round::new(data, RoundConfig::default(), Online, now).unwrap();
        round.take_effects();
        round
    }

    #[test]
    fn test_clock_snapshot_applied_when_live() {
        let now = Instant::now();
        let mut round = clocked_round(now);
        let mut event = move_event(2, "e7e5");
        event.clock = Some(ClockSnapshot {
            white: 42.0,
            black: 37.5,
        });
        round.apply_move(event, now);
        assert!(round.history().is_live());
        assert_eq!(
            round.clock().remaining(Color::White),
            Some(Duration::from_secs(42))
        );
        assert_eq!(
            round.clock().remaining(Color::Black),
            Some(Duration::from_millis(37_500))
        );
    }

    #[test]
    fn test_clock_snapshot_applied_when_browsing() {
        let now = Instant::now();
        let mut round = clocked_round(now);
        assert!(round.jump(0));

        let mut event = move_event(2, "e7e5");
        event.clock = Some(ClockSnapshot {
            white: 5.0,
            black: 7.0,
        });
        round.apply_move(event, now);
        assert_eq!(round.history().current_ply(), 0);
        assert_eq!(
            round.clock().remaining(Color::White),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            round.clock().remaining(Color::Black),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_draw_offer_signals_once() {
        let now = Instant::now();
        let mut round = make_round(Color::White, 0, 1, now);
        let dongs = |effects: &[Effect]| {
            effects
                .iter()
                .filter(|e| **e == Effect::Sound(Sound::Dong))
                .count()
        };

        let mut event = move_event(1, "e2e4");
        event.b_draw = true;
        round.apply_move(event, now);
        assert_eq!(dongs(&round.take_effects()), 1);
        assert!(round.meta().opponent.offering_draw);

        let mut event = move_event(2, "e7e5");
        event.b_draw = true;
        round.apply_move(event, now);
        assert_eq!(dongs(&round.take_effects()), 0);

        round.apply_move(move_event(3, "g1f3"), now);
        assert!(!round.meta().opponent.offering_draw);
        let mut event = move_event(4, "b8c6");
        event.b_draw = true;
        round.apply_move(event, now);
        assert_eq!(dongs(&round.take_effects()), 1);
    }

    #[test]
    fn test_dests_cleared_on_opponent_turn() {
        let now = Instant::now();
        let mut round = make_round(Color::White, 0, 1, now);
        let mut event = move_event(1, "e2e4");
        event.dests = Some(BTreeMap::from([("e7".to_string(), "e5".to_string())]));
        event.drops = Some("e4".to_string());
        round.apply_move(event, now);
        assert_eq!(round.meta().possible_moves, None);
        assert_eq!(round.meta().possible_drops, None);
    }

    #[test]
    fn test_castle_and_enpassant_deltas() {
        let now = Instant::now();
        let mut round = make_round(Color::Black, 0, 1, now);
        let mut event = move_event(1, "e1g1");
        event.castle = Some(Castle {
            king: [sq("e1"), sq("g1")],
            rook: [sq("h1"), sq("f1")],
            color: Color::White,
        });
        round.apply_move(event, now);
        let effects = round.take_effects();
        let BoardCommand::ApiMove { pieces, .. } = board_moves(&effects)[0] else {
            panic!("expected api move");
        };
        assert_eq!(pieces.len(), 4);
        assert_eq!(pieces[&sq("e1")], None);
        assert_eq!(
            pieces[&sq("f1")],
            Some(Piece {
                role: Role::Rook,
                color: Color::White
            })
        );

        let mut event = move_event(2, "d4e3");
        event.enpassant = Some(Enpassant {
            key: sq("e4"),
            color: Color::Black,
        });
        round.apply_move(event, now);
        let effects = round.take_effects();
        assert!(effects.contains(&Effect::Sound(Sound::Capture)));
        let BoardCommand::ApiMove { pieces, .. } = board_moves(&effects)[0] else {
            panic!("expected api move");
        };
        assert_eq!(pieces.get(&sq("e4")), Some(&None));
    }

    #[test]
    fn test_auto_castle_skips_delta() {
        let now = Instant::now();
        let data = GameData {
            meta: make_meta(Color::Black),
            steps: vec![Step::new(0, "start")],
            clock: None,
            correspondence: None,
        };
        let config = RoundConfig {
            auto_castle_handled_externally: true,
            ..RoundConfig::default()
        };
        let mut round = Round::new(data, config, Online, now).unwrap();
        round.take_effects();

        let mut event = move_event(1, "e1g1");
        event.castle = Some(Castle {
            king: [sq("e1"), sq("g1")],
            rook: [sq("h1"), sq("f1")],
            color: Color::White,
        });
        round.apply_move(event, now);
        let effects = round.take_effects();
        let BoardCommand::ApiMove { pieces, .. } = board_moves(&effects)[0] else {
            panic!("expected api move");
        };
        assert!(pieces.is_empty());
    }

    #[test]
    fn test_atomic_enpassant_explodes() {
        let now = Instant::now();
        let mut round = make_round(Color::Black, 0, 1, now);
        round.meta.game.variant.key = VariantKey::Atomic;
        let mut event = move_event(1, "d5e6");
        event.enpassant = Some(Enpassant {
            key: sq("e5"),
            color: Color::Black,
        });
        round.apply_move(event, now);
        let effects = round.take_effects();
        assert!(effects.contains(&Effect::Board(BoardCommand::Explode { square: sq("e5") })));
        assert!(effects.contains(&Effect::Sound(Sound::Explosion)));
    }

    #[test]
    fn test_drop_and_promotion() {
        let now = Instant::now();
        let mut round = make_round(Color::White, 0, 2, now);
        let mut drop = move_event(2, "N@f3");
        drop.is_move = false;
        drop.role = Some(Role::Knight);
        round.apply_move(drop, now);
        let effects = round.take_effects();
        let BoardCommand::NewPiece {
            piece,
            square,
            config,
            ..
        } = board_moves(&effects)[0]
        else {
            panic!("expected new piece");
        };
        assert_eq!(
            *piece,
            Piece {
                role: Role::Knight,
                color: Color::Black
            }
        );
        assert_eq!(*square, sq("f3"));
        assert_eq!(config.turn_color, Color::White);
        assert!(config.dests.is_empty());

        let mut promo = move_event(3, "e7e8q");
        promo.promotion = Some(Promotion {
            key: sq("e8"),
            piece_class: Role::Queen,
        });
        round.apply_move(promo, now);
        assert!(round
            .take_effects()
            .contains(&Effect::Board(BoardCommand::Promote {
                square: sq("e8"),
                role: Role::Queen
            })));
    }

    #[test]
    fn test_premove_waits_for_settle() {
        let t0 = Instant::now();
        let mut round = make_round(Color::White, 0, 1, t0);
        round.queue_premove(sq("g1"), sq("f3"));

        round.apply_move(move_event(1, "e2e4"), t0);
        assert!(round.premoves().waiting_on().is_none());

        round.apply_move(move_event(2, "e7e5"), t0);
        assert!(round.premoves().waiting_on().is_some());

        round.take_effects();
        round.poll(t0 + Duration::from_millis(5));
        assert!(round.take_effects().is_empty());

        round.poll(t0 + Duration::from_millis(10));
        assert_eq!(
            round.take_effects(),
            vec![Effect::Board(BoardCommand::PlayPremove {
                orig: sq("g1"),
                dest: sq("f3")
            })]
        );
        round.poll(t0 + Duration::from_millis(50));
        assert!(round.take_effects().is_empty());
    }
}

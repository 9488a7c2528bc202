//! Premove and predrop replay.
//!
//! The board queues at most one premove or predrop during the opponent's
//! turn. When the opponent's move lands, the replay is scheduled after the
//! board update it depends on has settled, then fires exactly once.

use super::timers::SettleToken;
use super::types::{Role, Square};

/// A queued speculative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queued {
    Premove { orig: Square, dest: Square },
    Predrop { role: Role, square: Square },
}

/// Holds the queued action and the replay waiting on a board update.
#[derive(Debug, Clone, Default)]
pub struct PremoveReplay {
    queued: Option<Queued>,
    waiting_on: Option<SettleToken>,
}

impl PremoveReplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a premove, replacing any earlier premove or predrop.
    pub fn set_premove(&mut self, orig: Square, dest: Square) {
        self.queued = Some(Queued::Premove { orig, dest });
    }

    /// Queue a predrop, replacing any earlier premove or predrop.
    pub fn set_predrop(&mut self, role: Role, square: Square) {
        self.queued = Some(Queued::Predrop { role, square });
    }

    pub fn clear(&mut self) {
        self.queued = None;
        self.waiting_on = None;
    }

    pub fn queued(&self) -> Option<Queued> {
        self.queued
    }

    pub fn is_queued(&self) -> bool {
        self.queued.is_some()
    }

    /// Arm the replay behind the board update `token`. Returns false when
    /// nothing is queued.
    pub fn arm(&mut self, token: SettleToken) -> bool {
        if self.queued.is_none() {
            return false;
        }
        self.waiting_on = Some(token);
        true
    }

    pub fn waiting_on(&self) -> Option<SettleToken> {
        self.waiting_on
    }

    /// Take the queued action once the board update `token` has settled.
    ///
    /// Returns `None` if the replay was disarmed or re-armed behind a later
    /// update in the meantime.
    pub fn take_for(&mut self, token: SettleToken) -> Option<Queued> {
        if self.waiting_on != Some(token) {
            return None;
        }
        self.waiting_on = None;
        self.queued.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    #[test]
    fn test_single_slot() {
        let mut replay = PremoveReplay::new();
        replay.set_premove(sq("e2"), sq("e4"));
        replay.set_predrop(Role::Knight, sq("f3"));
        assert_eq!(
            replay.queued(),
            Some(Queued::Predrop {
                role: Role::Knight,
                square: sq("f3")
            })
        );
    }

    #[test]
    fn test_arm_needs_queue() {
        let mut replay = PremoveReplay::new();
        assert!(!replay.arm(SettleToken(1)));
        assert_eq!(replay.waiting_on(), None);
    }

    #[test]
    fn test_take_once() {
        let mut replay = PremoveReplay::new();
        replay.set_premove(sq("e2"), sq("e4"));
        assert!(replay.arm(SettleToken(3)));

        assert_eq!(replay.take_for(SettleToken(2)), None);
        assert_eq!(
            replay.take_for(SettleToken(3)),
            Some(Queued::Premove {
                orig: sq("e2"),
                dest: sq("e4")
            })
        );
        assert_eq!(replay.take_for(SettleToken(3)), None);
        assert!(!replay.is_queued());
    }

    #[test]
    fn test_clear_disarms() {
        let mut replay = PremoveReplay::new();
        replay.set_premove(sq("e2"), sq("e4"));
        replay.arm(SettleToken(1));
        replay.clear();
        assert_eq!(replay.take_for(SettleToken(1)), None);
    }
}

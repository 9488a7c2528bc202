//! Board vocabulary shared by every component.
//!
//! Colors, squares, roles and the server's move notation. Legality is never
//! checked here; these types only parse what the server and the board send.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Side to move once `ply` half-moves have been played.
    pub fn to_move_at(ply: u32) -> Self {
        if ply % 2 == 0 {
            Self::White
        } else {
            Self::Black
        }
    }

    /// Side whose move produced `ply`.
    pub fn moved_at(ply: u32) -> Self {
        Self::to_move_at(ply).opposite()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UciError {
    #[error("invalid square: {0:?}")]
    InvalidSquare(String),

    #[error("invalid uci: {0:?}")]
    InvalidUci(String),
}

/// Algebraic board square, `a1` through `h8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    pub fn parse(s: &str) -> Result<Self, UciError> {
        let bytes = s.as_bytes();
        match bytes {
            [f @ b'a'..=b'h', r @ b'1'..=b'8'] => Ok(Self {
                file: f - b'a',
                rank: r - b'1',
            }),
            _ => Err(UciError::InvalidSquare(s.to_string())),
        }
    }

    /// Rank number as printed, 1 through 8.
    pub fn rank(&self) -> u8 {
        self.rank + 1
    }

    pub fn is_back_rank(&self) -> bool {
        self.rank == 0 || self.rank == 7
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

impl TryFrom<String> for Square {
    type Error = UciError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Square> for String {
    fn from(sq: Square) -> Self {
        sq.to_string()
    }
}

/// Piece role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }

    /// Suffix appended to a promoting move: knight is `n`, the rest use
    /// their first letter.
    pub fn promotion_suffix(&self) -> char {
        match self {
            Self::Knight => 'n',
            other => other.as_str().as_bytes()[0] as char,
        }
    }
}

/// A colored piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub role: Role,
    pub color: Color,
}

/// Origin and destination of a move or drop in server notation.
///
/// Drops are written `P@e4`; their origin is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uci {
    pub orig: Option<Square>,
    pub dest: Square,
}

impl Uci {
    pub fn parse(s: &str) -> Result<Self, UciError> {
        let invalid = || UciError::InvalidUci(s.to_string());
        let orig = s.get(0..2).ok_or_else(invalid)?;
        let dest = s.get(2..4).ok_or_else(invalid)?;
        let dest = Square::parse(dest).map_err(|_| invalid())?;
        let orig = if orig.ends_with('@') {
            None
        } else {
            Some(Square::parse(orig).map_err(|_| invalid())?)
        };
        Ok(Self { orig, dest })
    }

    /// Squares to highlight as the last move.
    pub fn last_move(&self) -> Vec<Square> {
        match self.orig {
            Some(orig) => vec![orig, self.dest],
            None => vec![self.dest],
        }
    }
}

/// Legal destinations per origin square.
pub type Dests = BTreeMap<Square, Vec<Square>>;

/// Parse the server's `possibleMoves` map (`{"e2": "e3e4"}`).
///
/// Unparseable entries are skipped.
pub fn parse_possible_moves(moves: Option<&BTreeMap<String, String>>) -> Dests {
    let mut dests = Dests::new();
    let Some(moves) = moves else {
        return dests;
    };
    for (orig, targets) in moves {
        let Ok(orig) = Square::parse(orig) else {
            continue;
        };
        let squares: Vec<Square> = targets
            .as_bytes()
            .chunks(2)
            .filter_map(|c| std::str::from_utf8(c).ok())
            .filter_map(|c| Square::parse(c).ok())
            .collect();
        dests.insert(orig, squares);
    }
    dests
}

/// Parse the server's `possibleDrops` string (`"e4f5g6"`).
pub fn parse_possible_drops(drops: &str) -> Vec<Square> {
    drops
        .as_bytes()
        .chunks(2)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .filter_map(|c| Square::parse(c).ok())
        .collect()
}

/// Game variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariantKey {
    #[default]
    Standard,
    Chess960,
    FromPosition,
    KingOfTheHill,
    ThreeCheck,
    Antichess,
    Atomic,
    Horde,
    RacingKings,
    Crazyhouse,
}

impl VariantKey {
    /// A capture also destroys the surrounding pieces.
    pub fn has_cascading_capture(&self) -> bool {
        matches!(self, Self::Atomic)
    }

    pub fn has_drops(&self) -> bool {
        matches!(self, Self::Crazyhouse)
    }
}

/// Time control class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Speed {
    UltraBullet,
    Bullet,
    #[default]
    Blitz,
    Rapid,
    Classical,
    Correspondence,
    Unlimited,
}

impl Speed {
    pub fn is_correspondence(&self) -> bool {
        matches!(self, Self::Correspondence)
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
    fn test_color_parity() {
        assert_eq!(Color::to_move_at(0), Color::White);
        assert_eq!(Color::to_move_at(11), Color::Black);
        assert_eq!(Color::moved_at(11), Color::White);
        assert_eq!(Color::moved_at(12), Color::Black);
    }

    #[test]
    fn test_square_parse() {
        assert_eq!(sq("e4").to_string(), "e4");
        assert_eq!(sq("h8").rank(), 8);
        assert!(sq("a1").is_back_rank());
        assert!(!sq("d5").is_back_rank());
        assert!(Square::parse("i1").is_err());
        assert!(Square::parse("e9").is_err());
        assert!(Square::parse("e").is_err());
    }

    #[test]
    fn test_uci_parse() {
        let m = Uci::parse("e2e4").unwrap();
        assert_eq!(m.orig, Some(sq("e2")));
        assert_eq!(m.dest, sq("e4"));

        let promo = Uci::parse("e7e8q").unwrap();
        assert_eq!(promo.dest, sq("e8"));

        let drop = Uci::parse("N@f3").unwrap();
        assert_eq!(drop.orig, None);
        assert_eq!(drop.last_move(), vec![sq("f3")]);

        assert!(Uci::parse("e2").is_err());
        assert!(Uci::parse("z2e4").is_err());
    }

    #[test]
    fn test_promotion_suffix() {
        assert_eq!(Role::Knight.promotion_suffix(), 'n');
        assert_eq!(Role::Queen.promotion_suffix(), 'q');
        assert_eq!(Role::Rook.promotion_suffix(), 'r');
        assert_eq!(Role::Bishop.promotion_suffix(), 'b');
    }

    #[test]
    fn test_parse_possible_moves() {
        let mut raw = BTreeMap::new();
        raw.insert("e2".to_string(), "e3e4".to_string());
        raw.insert("g1".to_string(), "f3h3".to_string());
        raw.insert("zz".to_string(), "a1".to_string());

        let dests = parse_possible_moves(Some(&raw));
        assert_eq!(dests.len(), 2);
        assert_eq!(dests[&sq("e2")], vec![sq("e3"), sq("e4")]);
        assert_eq!(dests[&sq("g1")], vec![sq("f3"), sq("h3")]);

        assert!(parse_possible_moves(None).is_empty());
    }

    #[test]
    fn test_parse_possible_drops() {
        assert_eq!(parse_possible_drops("e4f5"), vec![sq("e4"), sq("f5")]);
        assert!(parse_possible_drops("").is_empty());
    }

    #[test]
    fn test_serde_names() {
        let v: VariantKey = serde_json::from_str("\"kingOfTheHill\"").unwrap();
        assert_eq!(v, VariantKey::KingOfTheHill);
        let s: Speed = serde_json::from_str("\"correspondence\"").unwrap();
        assert!(s.is_correspondence());
        let square: Square = serde_json::from_str("\"c6\"").unwrap();
        assert_eq!(square, sq("c6"));
        assert!(serde_json::from_str::<Square>("\"c0\"").is_err());
        assert!(VariantKey::Atomic.has_cascading_capture());
        assert!(!VariantKey::Crazyhouse.has_cascading_capture());
    }
}

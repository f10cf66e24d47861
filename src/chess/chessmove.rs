use std::fmt::{Debug, Display, Formatter};

use crate::chess::{piece::PieceType, types::Square};

/// What a move does to the board, independent of whether it captures.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum MoveKind {
    Normal,
    DoublePush,
    EnPassant,
    Promotion,
    Castle,
}

/// A move packed into sixteen bits.
///
/// ```text
/// 0000 0000 0011 1111  from
/// 0000 1111 1100 0000  to
/// 0011 0000 0000 0000  detail: kind for non-promotions, piece for promotions
/// 0100 0000 0000 0000  capture
/// 1000 0000 0000 0000  promotion
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Move {
    data: u16,
}

impl Move {
    const FROM_MASK: u16 = 0b0000_0000_0011_1111;
    const TO_MASK: u16 = 0b0000_1111_1100_0000;
    const DETAIL_MASK: u16 = 0b0011_0000_0000_0000;
    const CAPTURE_FLAG: u16 = 0b0100_0000_0000_0000;
    const PROMO_FLAG: u16 = 0b1000_0000_0000_0000;

    const DETAIL_NORMAL: u16 = 0;
    const DETAIL_DOUBLE: u16 = 1 << 12;
    const DETAIL_EP: u16 = 2 << 12;
    const DETAIL_CASTLE: u16 = 3 << 12;

    /// The "no move found" sentinel.
    pub const NULL: Self = Self { data: 0 };

    /// Constructs a non-promotion move. Nothing is validated here: a move carrying
    /// an impossible kind/capture pairing is only rejected when it is applied.
    pub const fn new(from: Square, to: Square, kind: MoveKind, capture: bool) -> Self {
        let detail = match kind {
            MoveKind::Normal => Self::DETAIL_NORMAL,
            MoveKind::DoublePush => Self::DETAIL_DOUBLE,
            MoveKind::EnPassant => Self::DETAIL_EP,
            MoveKind::Castle => Self::DETAIL_CASTLE,
            MoveKind::Promotion => panic!("promotions must be built with Move::new_promotion"),
        };
        let capture = if capture { Self::CAPTURE_FLAG } else { 0 };
        Self {
            data: from.inner() as u16 | (to.inner() as u16) << 6 | detail | capture,
        }
    }

    pub const fn new_promotion(from: Square, to: Square, promo: PieceType, capture: bool) -> Self {
        assert!(promo.legal_promo(), "cannot promote to a pawn or king");
        // knight..queen occupy 1..=4, so this fits in the two detail bits.
        let detail = ((promo.inner() - 1) as u16) << 12;
        let capture = if capture { Self::CAPTURE_FLAG } else { 0 };
        Self {
            data: from.inner() as u16
                | (to.inner() as u16) << 6
                | detail
                | capture
                | Self::PROMO_FLAG,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(self) -> Square {
        match Square::new((self.data & Self::FROM_MASK) as u8) {
            Some(sq) => sq,
            None => unreachable!(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn to(self) -> Square {
        match Square::new(((self.data & Self::TO_MASK) >> 6) as u8) {
            Some(sq) => sq,
            None => unreachable!(),
        }
    }

    pub const fn kind(self) -> MoveKind {
        if self.data & Self::PROMO_FLAG != 0 {
            return MoveKind::Promotion;
        }
        match self.data & Self::DETAIL_MASK {
            Self::DETAIL_NORMAL => MoveKind::Normal,
            Self::DETAIL_DOUBLE => MoveKind::DoublePush,
            Self::DETAIL_EP => MoveKind::EnPassant,
            _ => MoveKind::Castle,
        }
    }

    pub const fn is_capture(self) -> bool {
        self.data & Self::CAPTURE_FLAG != 0
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn promotion_type(self) -> Option<PieceType> {
        if self.data & Self::PROMO_FLAG == 0 {
            return None;
        }
        PieceType::new(((self.data & Self::DETAIL_MASK) >> 12) as u8 + 1)
    }

    pub const fn is_promo(self) -> bool {
        self.data & Self::PROMO_FLAG != 0
    }

    pub const fn is_ep(self) -> bool {
        matches!(self.kind(), MoveKind::EnPassant)
    }

    pub const fn is_castle(self) -> bool {
        matches!(self.kind(), MoveKind::Castle)
    }

    pub const fn is_null(self) -> bool {
        self.data == 0
    }

    /// Whether the kind and capture flag form one of the seven meaningful pairings.
    pub const fn is_well_formed(self) -> bool {
        matches!(
            (self.kind(), self.is_capture()),
            (MoveKind::Normal | MoveKind::Promotion, _)
                | (MoveKind::DoublePush | MoveKind::Castle, false)
                | (MoveKind::EnPassant, true)
        )
    }

    /// Whether this move resets the fifty-move counter regardless of the piece moved.
    pub const fn is_tactical(self) -> bool {
        self.is_capture() || self.is_promo()
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }

        write!(f, "{}{}", self.from(), self.to())?;
        if let Some(pchar) = self.promotion_type().and_then(PieceType::promo_char) {
            write!(f, "{pchar}")?;
        }

        Ok(())
    }
}

impl Debug for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{self} ({:?}{}{})",
            self.kind(),
            if self.is_capture() { ", capture" } else { "" },
            self.promotion_type().map_or_else(String::new, |pt| format!(", to {pt}")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_move() {
        let m = Move::new(Square::A1, Square::B2, MoveKind::Normal, false);
        assert_eq!(m.from(), Square::A1);
        assert_eq!(m.to(), Square::B2);
        assert_eq!(m.kind(), MoveKind::Normal);
        assert!(!m.is_capture());
        assert!(!m.is_null());
        assert_eq!(m.promotion_type(), None);
        assert!(m.is_well_formed());
        assert_eq!(m.to_string(), "a1b2");
    }

    #[test]
    fn promotion() {
        let m = Move::new_promotion(Square::A7, Square::B8, PieceType::Knight, true);
        assert_eq!(m.from(), Square::A7);
        assert_eq!(m.to(), Square::B8);
        assert_eq!(m.kind(), MoveKind::Promotion);
        assert!(m.is_capture());
        assert_eq!(m.promotion_type(), Some(PieceType::Knight));
        assert_eq!(m.to_string(), "a7b8n");
        for pt in PieceType::PROMOTIONS {
            let m = Move::new_promotion(Square::H2, Square::H1, pt, false);
            assert_eq!(m.promotion_type(), Some(pt));
        }
    }

    #[test]
    fn all_square_combinations() {
        for from in Square::all() {
            for to in Square::all() {
                let m = Move::new(from, to, MoveKind::Castle, false);
                assert_eq!(m.from(), from);
                assert_eq!(m.to(), to);
                assert!(m.is_castle());
            }
        }
    }

    #[test]
    fn malformed_pairings() {
        assert!(!Move::new(Square::E2, Square::E4, MoveKind::DoublePush, true).is_well_formed());
        assert!(!Move::new(Square::E1, Square::G1, MoveKind::Castle, true).is_well_formed());
        assert!(!Move::new(Square::E5, Square::D6, MoveKind::EnPassant, false).is_well_formed());
        assert!(Move::new(Square::E5, Square::D6, MoveKind::EnPassant, true).is_well_formed());
    }

    #[test]
    fn null_move() {
        assert!(Move::NULL.is_null());
        assert_eq!(Move::NULL.to_string(), "0000");
    }
}

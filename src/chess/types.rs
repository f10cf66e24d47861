use std::{
    fmt::{self, Display},
    mem::size_of,
    ops::{Index, IndexMut},
    str::FromStr,
};

use crate::chess::{piece::Colour, squareset::SquareSet};

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

const _FILE_ASSERT: () = assert!(size_of::<File>() == size_of::<Option<File>>());

impl File {
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: inner is less than 8, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn abs_diff(self, other: Self) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..8`.
        (0..8u8).map(|i| unsafe { std::mem::transmute(i) })
    }

    pub const fn char(self) -> char {
        (b'a' + self as u8) as char
    }
}

impl<T> Index<File> for [T; 8] {
    type Output = T;

    fn index(&self, index: File) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

const _RANK_ASSERT: () = assert!(size_of::<Rank>() == size_of::<Option<Rank>>());

impl Rank {
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: inner is less than 8, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn abs_diff(self, other: Self) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..8`.
        (0..8u8).map(|i| unsafe { std::mem::transmute(i) })
    }

    pub const fn char(self) -> char {
        (b'1' + self as u8) as char
    }

    /// The rank as seen from `side`'s half of the board.
    pub const fn relative_to(self, side: Colour) -> Self {
        match side {
            Colour::White => self,
            // SAFETY: 7 - x for x in 0..8 stays within 0..8.
            Colour::Black => unsafe { std::mem::transmute::<u8, Self>(7 - self as u8) },
        }
    }
}

impl<T> Index<Rank> for [T; 8] {
    type Output = T;

    fn index(&self, index: Rank) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

#[rustfmt::skip]
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug, Default)]
#[repr(u8)]
pub enum Square {
    #[default]
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

const _SQUARE_ASSERT: () = assert!(size_of::<Square>() == size_of::<Option<Square>>());

impl<T> Index<Square> for [T; 64] {
    type Output = T;

    fn index(&self, index: Square) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<Square> for [T; 64] {
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

static SQUARE_NAMES: [&str; 64] = [
    "a1", "b1", "c1", "d1", "e1", "f1", "g1", "h1", "a2", "b2", "c2", "d2", "e2", "f2", "g2", "h2",
    "a3", "b3", "c3", "d3", "e3", "f3", "g3", "h3", "a4", "b4", "c4", "d4", "e4", "f4", "g4", "h4",
    "a5", "b5", "c5", "d5", "e5", "f5", "g5", "h5", "a6", "b6", "c6", "d6", "e6", "f6", "g6", "h6",
    "a7", "b7", "c7", "d7", "e7", "f7", "g7", "h7", "a8", "b8", "c8", "d8", "e8", "f8", "g8", "h8",
];

impl Square {
    pub const fn from_rank_file(rank: Rank, file: File) -> Self {
        let inner = rank as u8 * 8 + file as u8;
        // SAFETY: Rank and File are constrained such that inner is always < 64.
        unsafe { std::mem::transmute(inner) }
    }

    pub const fn new(inner: u8) -> Option<Self> {
        if inner < 64 {
            // SAFETY: inner is less than 64, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(inner) })
        } else {
            None
        }
    }

    /// SAFETY: you may only call this function with value of `inner` less than 64.
    pub const unsafe fn new_unchecked(inner: u8) -> Self {
        debug_assert!(inner < 64);
        // SAFETY: caller's precondition.
        unsafe { std::mem::transmute(inner) }
    }

    pub const fn flip_rank(self) -> Self {
        // SAFETY: given the precondition that `self as u8` is less than 64,
        // this operation cannot construct a value >= 64.
        unsafe { std::mem::transmute(self as u8 ^ 0b111_000) }
    }

    pub const fn relative_to(self, side: Colour) -> Self {
        if matches!(side, Colour::White) {
            self
        } else {
            self.flip_rank()
        }
    }

    /// The file that this square is on.
    pub const fn file(self) -> File {
        // SAFETY: `self as u8` is less than 64, and this operation can only
        // decrease the value, so cannot construct a value >= 64.
        unsafe { std::mem::transmute(self as u8 % 8) }
    }

    /// The rank that this square is on.
    pub const fn rank(self) -> Rank {
        // SAFETY: `self as u8` is less than 64, and this operation can only
        // decrease the value, so cannot construct a value >= 64.
        unsafe { std::mem::transmute(self as u8 / 8) }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn inner(self) -> u8 {
        self as u8
    }

    /// Offsets the square by `delta` squares, returning `None` if the result leaves the board.
    /// Note that this does not check for wrapping between files.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub const fn offset(self, delta: i8) -> Option<Self> {
        let res = self as i16 + delta as i16;
        if res < 0 || res >= 64 {
            None
        } else {
            Self::new(res as u8)
        }
    }

    pub const fn as_set(self) -> SquareSet {
        SquareSet::from_inner(1 << self as u8)
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..64`.
        (0..64u8).map(|i| unsafe { std::mem::transmute(i) })
    }

    pub fn name(self) -> &'static str {
        SQUARE_NAMES[self]
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SQUARE_NAMES[*self])
    }
}

impl FromStr for Square {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SQUARE_NAMES
            .iter()
            .position(|&name| name == s)
            .and_then(|index| -> Option<u8> { index.try_into().ok() })
            .and_then(Self::new)
            .ok_or("Invalid square name")
    }
}

/// Castling permissions, packed into the low four bits of a byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct CastlingRights {
    bits: u8,
}

impl CastlingRights {
    pub const WK: u8 = 0b0001;
    pub const WQ: u8 = 0b0010;
    pub const BK: u8 = 0b0100;
    pub const BQ: u8 = 0b1000;

    pub const NONE: Self = Self { bits: 0 };
    pub const ALL: Self = Self { bits: 0b1111 };

    pub const fn from_bits(bits: u8) -> Self {
        Self { bits: bits & 0b1111 }
    }

    pub const fn bits(self) -> u8 {
        self.bits
    }

    pub const fn index(self) -> usize {
        self.bits as usize
    }

    pub const fn kingside(self, side: Colour) -> bool {
        let flag = match side {
            Colour::White => Self::WK,
            Colour::Black => Self::BK,
        };
        self.bits & flag != 0
    }

    pub const fn queenside(self, side: Colour) -> bool {
        let flag = match side {
            Colour::White => Self::WQ,
            Colour::Black => Self::BQ,
        };
        self.bits & flag != 0
    }

    pub const fn with(self, flag: u8) -> Self {
        Self::from_bits(self.bits | flag)
    }

    /// Intersects the rights with the clearing masks of both squares touched by a move.
    pub const fn after_move(self, from: Square, to: Square) -> Self {
        Self {
            bits: self.bits & RIGHTS_MASK[from as usize] & RIGHTS_MASK[to as usize],
        }
    }
}

/// Rights that survive a move touching each square: moving the king or a rook
/// away from its home square, or capturing on a rook's home square, clears a right.
const RIGHTS_MASK: [u8; 64] = {
    let mut masks = [0b1111; 64];
    masks[Square::A1 as usize] = !CastlingRights::WQ & 0b1111;
    masks[Square::E1 as usize] = !(CastlingRights::WK | CastlingRights::WQ) & 0b1111;
    masks[Square::H1 as usize] = !CastlingRights::WK & 0b1111;
    masks[Square::A8 as usize] = !CastlingRights::BQ & 0b1111;
    masks[Square::E8 as usize] = !(CastlingRights::BK | CastlingRights::BQ) & 0b1111;
    masks[Square::H8 as usize] = !CastlingRights::BK & 0b1111;
    masks
};

impl Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits == 0 {
            return write!(f, "-");
        }
        for (flag, c) in [(Self::WK, 'K'), (Self::WQ, 'Q'), (Self::BK, 'k'), (Self::BQ, 'q')] {
            if self.bits & flag != 0 {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_names_round_trip() {
        for sq in Square::all() {
            assert_eq!(sq.name().parse::<Square>(), Ok(sq));
            assert_eq!(Square::from_rank_file(sq.rank(), sq.file()), sq);
        }
        assert!("i9".parse::<Square>().is_err());
    }

    #[test]
    fn offsets_stay_on_board() {
        assert_eq!(Square::E2.offset(16), Some(Square::E4));
        assert_eq!(Square::E7.offset(-16), Some(Square::E5));
        assert_eq!(Square::H8.offset(1), None);
        assert_eq!(Square::A1.offset(-1), None);
    }

    #[test]
    fn relative_ranks() {
        assert_eq!(Rank::Two.relative_to(Colour::Black), Rank::Seven);
        assert_eq!(Rank::Two.relative_to(Colour::White), Rank::Two);
        assert_eq!(Square::E1.relative_to(Colour::Black), Square::E8);
    }

    #[test]
    fn rights_clearing() {
        let all = CastlingRights::ALL;
        let after_king = all.after_move(Square::E1, Square::E2);
        assert!(!after_king.kingside(Colour::White));
        assert!(!after_king.queenside(Colour::White));
        assert!(after_king.kingside(Colour::Black));

        let rook_taken = all.after_move(Square::B7, Square::H8);
        assert!(!rook_taken.kingside(Colour::Black));
        assert!(rook_taken.queenside(Colour::Black));
        assert_eq!(all.after_move(Square::D4, Square::D5), all);
    }

    #[test]
    fn rights_display() {
        assert_eq!(CastlingRights::ALL.to_string(), "KQkq");
        assert_eq!(CastlingRights::NONE.to_string(), "-");
        let rights = CastlingRights::from_bits(CastlingRights::WQ | CastlingRights::BK);
        assert_eq!(rights.to_string(), "Qk");
    }
}

use std::{
    fmt::Display,
    ops::{
        BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, Shr, Sub,
        SubAssign,
    },
};

use crate::chess::types::Square;

/// A set of squares, with support for very fast set operations and in-order iteration.
/// Most chess engines call this type `Bitboard`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct SquareSet {
    inner: u64,
}

impl SquareSet {
    pub const EMPTY: Self = Self { inner: 0 };
    pub const FULL: Self = Self { inner: !0 };

    pub const RANK_1: Self = Self::from_inner(0x0000_0000_0000_00FF);
    pub const RANK_2: Self = Self::from_inner(0x0000_0000_0000_FF00);
    pub const RANK_7: Self = Self::from_inner(0x00FF_0000_0000_0000);
    pub const RANK_8: Self = Self::from_inner(0xFF00_0000_0000_0000);

    pub const BACK_RANKS: Self = Self::union(Self::RANK_1, Self::RANK_8);

    pub const fn from_inner(inner: u64) -> Self {
        Self { inner }
    }

    pub const fn inner(self) -> u64 {
        self.inner
    }

    /// Population count.
    pub const fn count(self) -> u32 {
        self.inner.count_ones()
    }

    pub const fn is_empty(self) -> bool {
        self.inner == 0
    }

    pub const fn non_empty(self) -> bool {
        self.inner != 0
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self {
            inner: self.inner & other.inner,
        }
    }

    pub const fn union(self, other: Self) -> Self {
        Self {
            inner: self.inner | other.inner,
        }
    }

    pub const fn contains_square(self, square: Square) -> bool {
        (self.inner & (1 << square.index())) != 0
    }

    pub const fn add_square(self, square: Square) -> Self {
        Self {
            inner: self.inner | (1 << square.index()),
        }
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn iter(self) -> SquareIter {
        SquareIter::new(self.inner)
    }

    /// The lowest-indexed square in the set, if there is one.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn first(self) -> Option<Square> {
        Square::new(self.inner.trailing_zeros() as u8)
    }

    pub const fn without_lsb(self) -> Self {
        Self {
            inner: self.inner & self.inner.wrapping_sub(1),
        }
    }

    pub const fn one(self) -> bool {
        self.inner != 0 && self.without_lsb().inner == 0
    }

    pub const fn many(self) -> bool {
        self.without_lsb().inner != 0
    }

    /// Parallel bit deposit: scatters the low bits of `index` onto the squares of `self`,
    /// lowest square first. Enumerating `index` over `0..1 << self.count()` visits every
    /// subset of `self` exactly once.
    pub const fn deposit(self, index: u64) -> Self {
        let mut mask = self.inner;
        let mut out = 0;
        let mut bit = 0;
        while mask != 0 {
            let lowest = mask & mask.wrapping_neg();
            if index >> bit & 1 != 0 {
                out |= lowest;
            }
            mask &= mask - 1;
            bit += 1;
        }
        Self { inner: out }
    }
}

/// Iterator over the squares of a square-set.
/// The squares are returned in increasing order.
pub struct SquareIter {
    value: u64,
}

impl SquareIter {
    pub const fn new(value: u64) -> Self {
        Self { value }
    }
}

impl Iterator for SquareIter {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.value == 0 {
            None
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let lsb: u8 = self.value.trailing_zeros() as u8;
            self.value &= self.value - 1;
            // SAFETY: u64::trailing_zeros of a non-zero value is within `0..64`,
            // all of which correspond to valid enum variants of Square.
            Some(unsafe { Square::new_unchecked(lsb) })
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.value.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SquareIter {}

impl IntoIterator for SquareSet {
    type Item = Square;
    type IntoIter = SquareIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl BitOr for SquareSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner | rhs.inner,
        }
    }
}

impl BitOrAssign for SquareSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.inner |= rhs.inner;
    }
}

impl BitAnd for SquareSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner & rhs.inner,
        }
    }
}

impl BitAndAssign for SquareSet {
    fn bitand_assign(&mut self, rhs: Self) {
        self.inner &= rhs.inner;
    }
}

impl BitXor for SquareSet {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner ^ rhs.inner,
        }
    }
}

impl BitXorAssign for SquareSet {
    fn bitxor_assign(&mut self, rhs: Self) {
        self.inner ^= rhs.inner;
    }
}

impl Sub for SquareSet {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner & !rhs.inner,
        }
    }
}

impl SubAssign for SquareSet {
    fn sub_assign(&mut self, rhs: Self) {
        self.inner &= !rhs.inner;
    }
}

impl Not for SquareSet {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self { inner: !self.inner }
    }
}

impl Shr<u8> for SquareSet {
    type Output = Self;

    fn shr(self, rhs: u8) -> Self::Output {
        Self {
            inner: self.inner >> rhs,
        }
    }
}

impl Shl<u8> for SquareSet {
    type Output = Self;

    fn shl(self, rhs: u8) -> Self::Output {
        Self {
            inner: self.inner << rhs,
        }
    }
}

impl Display for SquareSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                let bit = 1u64 << (rank * 8 + file);
                write!(f, "{}", if self.inner & bit != 0 { '1' } else { '0' })?;
            }
            if rank > 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::chess::{squareset::SquareSet, types::Square};

    #[test]
    fn counters() {
        let empty = SquareSet::EMPTY;
        assert!(empty.is_empty());
        assert!(!empty.one());
        assert!(!empty.many());

        let one = Square::E4.as_set();
        assert!(one.non_empty());
        assert!(one.one());
        assert!(!one.many());

        let two = one.add_square(Square::E5);
        assert!(!two.one());
        assert!(two.many());
        assert_eq!(two.count(), 2);
    }

    #[test]
    fn lowest_bit_extraction() {
        let set = Square::C3.as_set() | Square::F7.as_set() | Square::H8.as_set();
        assert_eq!(set.first(), Some(Square::C3));
        assert_eq!(set.without_lsb().first(), Some(Square::F7));
        assert_eq!(SquareSet::EMPTY.first(), None);
        assert_eq!(set.iter().collect::<Vec<_>>(), [Square::C3, Square::F7, Square::H8]);
    }

    #[test]
    fn deposit_enumerates_subsets() {
        let mask = Square::B2.as_set() | Square::D4.as_set() | Square::G7.as_set();
        assert_eq!(mask.deposit(0), SquareSet::EMPTY);
        assert_eq!(mask.deposit(0b001), Square::B2.as_set());
        assert_eq!(mask.deposit(0b010), Square::D4.as_set());
        assert_eq!(mask.deposit(0b101), Square::B2.as_set() | Square::G7.as_set());
        assert_eq!(mask.deposit(0b111), mask);

        let mut seen = (0..8).map(|i| mask.deposit(i).inner()).collect::<Vec<_>>();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn full_mask_deposit_is_identity() {
        let value = 0xDEAD_BEEF_0123_4567;
        assert_eq!(SquareSet::FULL.deposit(value).inner(), value);
    }
}

//! Magic-multiplication lookup tables for sliding attacks and pawn double pushes.
//!
//! Every table is built at first use from a pinned multiplier per square. A pinned
//! multiplier is checked against the exhaustive occupancy enumeration for its square
//! before it is trusted, and a fresh one is searched for if the check fails.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::sync::LazyLock;

use crate::{
    chess::{piece::Colour, squareset::SquareSet, types::Square},
    rng::XorShiftState,
};

/// The families of moves that are looked up by occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slider {
    Bishop,
    Rook,
    DoublePush(Colour),
}

impl Slider {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::DoublePush(Colour::White) => "white double push",
            Self::DoublePush(Colour::Black) => "black double push",
        }
    }

    /// The squares whose occupancy can change the result from `sq`.
    pub const fn relevance_mask(self, sq: Square) -> SquareSet {
        match self {
            Self::Bishop => mask_bishop_attacks(sq),
            Self::Rook => mask_rook_attacks(sq),
            Self::DoublePush(colour) => mask_double_push(colour, sq),
        }
    }

    /// Computes the result by walking the board, without any table.
    pub const fn moves_on_the_fly(self, sq: Square, blockers: SquareSet) -> SquareSet {
        match self {
            Self::Bishop => bishop_attacks_on_the_fly(sq, blockers),
            Self::Rook => rook_attacks_on_the_fly(sq, blockers),
            Self::DoublePush(colour) => double_push_on_the_fly(colour, sq, blockers),
        }
    }

    const fn pinned(self) -> &'static [u64; 64] {
        match self {
            Self::Bishop => &BISHOP_MAGICS,
            Self::Rook => &ROOK_MAGICS,
            Self::DoublePush(Colour::White) => &WHITE_DOUBLE_PUSH_MAGICS,
            Self::DoublePush(Colour::Black) => &BLACK_DOUBLE_PUSH_MAGICS,
        }
    }

    const fn salt(self) -> u64 {
        match self {
            Self::Bishop => 0x0B15,
            Self::Rook => 0x0500C,
            Self::DoublePush(Colour::White) => 0xD0B1,
            Self::DoublePush(Colour::Black) => 0xD0B2,
        }
    }
}

const fn mask_bishop_attacks(sq: Square) -> SquareSet {
    let mut attacks = 0;

    let (mut f, mut r);

    let tr = sq.rank() as i32;
    let tf = sq.file() as i32;

    cfor!((r, f) = (tr + 1, tf + 1); r <= 6 && f <= 6; (r, f) = (r + 1, f + 1); {
        attacks |= 1 << (r * 8 + f);
    });
    cfor!((r, f) = (tr + 1, tf - 1); r <= 6 && f >= 1; (r, f) = (r + 1, f - 1); {
        attacks |= 1 << (r * 8 + f);
    });
    cfor!((r, f) = (tr - 1, tf + 1); r >= 1 && f <= 6; (r, f) = (r - 1, f + 1); {
        attacks |= 1 << (r * 8 + f);
    });
    cfor!((r, f) = (tr - 1, tf - 1); r >= 1 && f >= 1; (r, f) = (r - 1, f - 1); {
        attacks |= 1 << (r * 8 + f);
    });

    SquareSet::from_inner(attacks)
}

const fn mask_rook_attacks(sq: Square) -> SquareSet {
    let mut attacks = 0;

    let (mut f, mut r);

    let tr = sq.rank() as i32;
    let tf = sq.file() as i32;

    cfor!(r = tr + 1; r <= 6; r += 1; {
        attacks |= 1 << (r * 8 + tf);
    });
    cfor!(r = tr - 1; r >= 1; r -= 1; {
        attacks |= 1 << (r * 8 + tf);
    });
    cfor!(f = tf + 1; f <= 6; f += 1; {
        attacks |= 1 << (tr * 8 + f);
    });
    cfor!(f = tf - 1; f >= 1; f -= 1; {
        attacks |= 1 << (tr * 8 + f);
    });

    SquareSet::from_inner(attacks)
}

/// The one- and two-step squares in front of a pawn on its starting rank.
/// Empty everywhere else.
const fn mask_double_push(colour: Colour, sq: Square) -> SquareSet {
    let index = sq.inner();
    match colour {
        Colour::White if index >= 8 && index < 16 => {
            SquareSet::from_inner(1 << (index + 8) | 1 << (index + 16))
        }
        Colour::Black if index >= 48 && index < 56 => {
            SquareSet::from_inner(1 << (index - 8) | 1 << (index - 16))
        }
        _ => SquareSet::EMPTY,
    }
}

pub const fn bishop_attacks_on_the_fly(square: Square, block: SquareSet) -> SquareSet {
    let mut attacks = 0;

    let block = block.inner();

    let (mut f, mut r);

    let tr = square.rank() as i32;
    let tf = square.file() as i32;

    cfor!((r, f) = (tr + 1, tf + 1); r <= 7 && f <= 7; (r, f) = (r + 1, f + 1); {
        let sq_bb = 1 << (r * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!((r, f) = (tr + 1, tf - 1); r <= 7 && f >= 0; (r, f) = (r + 1, f - 1); {
        let sq_bb = 1 << (r * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!((r, f) = (tr - 1, tf + 1); r >= 0 && f <= 7; (r, f) = (r - 1, f + 1); {
        let sq_bb = 1 << (r * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!((r, f) = (tr - 1, tf - 1); r >= 0 && f >= 0; (r, f) = (r - 1, f - 1); {
        let sq_bb = 1 << (r * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });

    SquareSet::from_inner(attacks)
}

pub const fn rook_attacks_on_the_fly(square: Square, block: SquareSet) -> SquareSet {
    let mut attacks = 0;

    let block = block.inner();

    let (mut f, mut r);

    let tr = square.rank() as i32;
    let tf = square.file() as i32;

    cfor!(r = tr + 1; r <= 7; r += 1; {
        let sq_bb = 1 << (r * 8 + tf);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!(r = tr - 1; r >= 0; r -= 1; {
        let sq_bb = 1 << (r * 8 + tf);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!(f = tf + 1; f <= 7; f += 1; {
        let sq_bb = 1 << (tr * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!(f = tf - 1; f >= 0; f -= 1; {
        let sq_bb = 1 << (tr * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });

    SquareSet::from_inner(attacks)
}

/// The double-push target if both squares in front of the pawn are empty.
pub const fn double_push_on_the_fly(colour: Colour, square: Square, block: SquareSet) -> SquareSet {
    let mask = mask_double_push(colour, square);
    if mask.is_empty() || mask.intersection(block).non_empty() {
        return SquareSet::EMPTY;
    }
    let index = square.inner();
    match colour {
        Colour::White => SquareSet::from_inner(1 << (index + 16)),
        Colour::Black => SquareSet::from_inner(1 << (index - 16)),
    }
}

/**************************************\
|      Verifying magic numbers         |
\**************************************/

/// Right-shift that maps a product onto a table of `1 << bits` slots.
/// A zero-bit mask still gets one slot.
pub const fn shift_for(bits: u32) -> u32 {
    64 - if bits == 0 { 1 } else { bits }
}

const fn magic_index(occupancy: SquareSet, magic: u64, shift: u32) -> usize {
    (occupancy.inner().wrapping_mul(magic) >> shift) as usize
}

/// Every occupancy of a square's relevance mask, paired with its true result.
struct Enumeration {
    occupancies: Vec<SquareSet>,
    results: Vec<SquareSet>,
    bits: u32,
}

impl Enumeration {
    fn new(slider: Slider, sq: Square) -> Self {
        let mask = slider.relevance_mask(sq);
        let bits = mask.count();
        let occupancies: Vec<SquareSet> = (0..1u64 << bits).map(|i| mask.deposit(i)).collect();
        let results = occupancies
            .iter()
            .map(|&occ| slider.moves_on_the_fly(sq, occ))
            .collect();
        Self { occupancies, results, bits }
    }

    const fn table_size(&self) -> usize {
        1 << if self.bits == 0 { 1 } else { self.bits }
    }

    /// Fills `slots` with the results under `magic`, or returns false on a collision
    /// between two occupancies that need different results.
    fn try_fill(&self, magic: u64, slots: &mut [Option<SquareSet>]) -> bool {
        let shift = shift_for(self.bits);
        slots.fill(None);
        for (&occ, &result) in self.occupancies.iter().zip(&self.results) {
            let slot = &mut slots[magic_index(occ, magic, shift)];
            match *slot {
                None => *slot = Some(result),
                Some(existing) if existing == result => {}
                Some(_) => return false,
            }
        }
        true
    }
}

/// Checks that `magic` separates every pair of occupancies from `sq` that need
/// different results.
pub fn is_valid_magic(slider: Slider, sq: Square, magic: u64) -> bool {
    let enumeration = Enumeration::new(slider, sq);
    let mut slots = vec![None; enumeration.table_size()];
    enumeration.try_fill(magic, &mut slots)
}

fn find_magic(
    slider: Slider,
    sq: Square,
    enumeration: &Enumeration,
    slots: &mut [Option<SquareSet>],
) -> u64 {
    let mask = slider.relevance_mask(sq);
    let mut rng = XorShiftState::with_salt(slider.salt() ^ ((sq.inner() as u64) << 32));
    for _ in 0..100_000_000 {
        let magic = rng.random_few_bits();

        // small masks cannot fill the high byte, so the density filter only
        // applies to the big tables.
        if enumeration.bits >= 8
            && (mask.inner().wrapping_mul(magic) & 0xFF00_0000_0000_0000).count_ones() < 6
        {
            continue;
        }

        if enumeration.try_fill(magic, slots) {
            return magic;
        }
    }

    panic!("no magic number found for {} on {sq}", slider.name());
}

/// The multiplier used for `sq`, and whether `pinned` had to be replaced.
pub fn magic_for_square(slider: Slider, sq: Square, pinned: u64) -> (u64, bool) {
    let enumeration = Enumeration::new(slider, sq);
    let mut slots = vec![None; enumeration.table_size()];
    if enumeration.try_fill(pinned, &mut slots) {
        return (pinned, false);
    }
    (find_magic(slider, sq, &enumeration, &mut slots), true)
}

#[derive(Clone, Copy, Debug)]
struct MagicEntry {
    mask: SquareSet,
    magic: u64,
    shift: u32,
    offset: usize,
}

/// One flat table holding every square's slots back to back.
pub struct MagicTable {
    entries: [MagicEntry; 64],
    moves: Box<[SquareSet]>,
    regenerated: u32,
}

impl MagicTable {
    /// Builds the table for `slider` from the multipliers in `pinned`.
    pub fn build(slider: Slider, pinned: &[u64; 64]) -> Self {
        let mut entries = [MagicEntry {
            mask: SquareSet::EMPTY,
            magic: 0,
            shift: 64,
            offset: 0,
        }; 64];
        let mut moves = Vec::new();
        let mut regenerated = 0;

        for sq in Square::all() {
            let enumeration = Enumeration::new(slider, sq);
            let mut slots = vec![None; enumeration.table_size()];
            let magic = if enumeration.try_fill(pinned[sq], &mut slots) {
                pinned[sq]
            } else {
                tracing::warn!(
                    square = %sq,
                    table = slider.name(),
                    "pinned magic collides, searching for a replacement"
                );
                regenerated += 1;
                find_magic(slider, sq, &enumeration, &mut slots)
            };
            entries[sq] = MagicEntry {
                mask: slider.relevance_mask(sq),
                magic,
                shift: shift_for(enumeration.bits),
                offset: moves.len(),
            };
            moves.extend(slots.into_iter().map(|slot| slot.unwrap_or(SquareSet::EMPTY)));
        }

        tracing::debug!(
            table = slider.name(),
            slots = moves.len(),
            regenerated,
            "built magic table"
        );

        Self {
            entries,
            moves: moves.into_boxed_slice(),
            regenerated,
        }
    }

    #[inline]
    pub fn lookup(&self, sq: Square, occupied: SquareSet) -> SquareSet {
        let entry = &self.entries[sq];
        self.moves[entry.offset + magic_index(occupied & entry.mask, entry.magic, entry.shift)]
    }

    /// How many pinned multipliers failed verification and were replaced.
    pub const fn regenerated(&self) -> u32 {
        self.regenerated
    }
}

pub static BISHOP_TABLE: LazyLock<MagicTable> =
    LazyLock::new(|| MagicTable::build(Slider::Bishop, Slider::Bishop.pinned()));
pub static ROOK_TABLE: LazyLock<MagicTable> =
    LazyLock::new(|| MagicTable::build(Slider::Rook, Slider::Rook.pinned()));
pub static WHITE_DOUBLE_PUSH_TABLE: LazyLock<MagicTable> = LazyLock::new(|| {
    let slider = Slider::DoublePush(Colour::White);
    MagicTable::build(slider, slider.pinned())
});
pub static BLACK_DOUBLE_PUSH_TABLE: LazyLock<MagicTable> = LazyLock::new(|| {
    let slider = Slider::DoublePush(Colour::Black);
    MagicTable::build(slider, slider.pinned())
});

pub(crate) static BISHOP_MAGICS: [u64; 64] = [
    0x8414_0110_4401_0040, 0x0909_0108_0200_4002, 0x8008_0081_2200_0350, 0x0004_0402_8000_8000,
    0x000C_2C20_4000_10C0, 0x2028_8A20_A000_0000, 0x1024_0184_1C20_0000, 0x4002_0080_8801_1042,
    0xC210_8484_0802_0C10, 0x8100_0410_0092_0094, 0x0000_0802_104A_0008, 0x0621_1104_0080_0038,
    0x2008_0202_1000_0042, 0x0104_4110_0A90_0090, 0x0E02_00D6_0820_2804, 0x0002_05C4_0401_090C,
    0x0090_0841_420A_4400, 0x8909_0020_9200_8203, 0x2010_0212_0080_1100, 0x0008_0084_0120_264C,
    0x0104_0000_81A0_0060, 0x0004_4008_0910_1000, 0x4004_0620_8401_0988, 0x0846_0240_2201_0400,
    0x8020_2020_3444_0430, 0x2010_9001_0841_0500, 0x7806_9000_6244_0082, 0x0001_0040_0C00_4200,
    0x0004_0820_0C00_2001, 0x2008_00A0_0202_0100, 0x0102_0225_01C9_1014, 0x0004_1441_0084_5400,
    0x0028_2010_00A4_8502, 0x4804_1004_0909_0104, 0x8022_0022_2424_0800, 0x6000_400A_0000_2200,
    0x2040_4040_4014_0100, 0x1810_0102_0001_11C2, 0x6830_0500_C102_0240, 0x4011_00C8_8845_0400,
    0x2001_1028_2000_1400, 0x1002_0084_2080_0400, 0x1202_4024_011A_1000, 0x0028_01A0_2420_0800,
    0x5000_4881_0110_0400, 0x0202_0081_1500_0200, 0x0122_0208_0222_890A, 0x0404_0440_4140_2200,
    0x1024_0184_1C20_0000, 0x0880_4A44_1008_0020, 0x0803_009C_0088_0912, 0x0106_0428_840C_0000,
    0x0801_0D40_1041_0052, 0x9140_C008_2204_2020, 0x20B0_2008_0140_4119, 0x0909_0108_0200_4002,
    0x4002_0080_8801_1042, 0x0002_05C4_0401_090C, 0x0000_9008_2203_1040, 0x8000_0040_1442_0200,
    0x1001_0000_3020_2200, 0x4040_A040_0809_0100, 0xC210_8484_0802_0C10, 0x8414_0110_4401_0040,
];

pub(crate) static ROOK_MAGICS: [u64; 64] = [
    0x0080_0020_8040_0010, 0x8040_1000_2000_4000, 0x4080_2000_1000_0880, 0x8100_0804_1000_2100,
    0x4080_0280_0800_0400, 0x0200_0200_0410_0801, 0x0400_1004_0100_8248, 0x0100_0080_2100_0042,
    0x0820_8000_2080_4010, 0x0008_8040_0080_2000, 0x1004_8020_0210_0084, 0x5004_8008_0080_1003,
    0x0880_8004_0080_0800, 0x1001_0002_0401_0008, 0x0084_0088_015A_0410, 0x0102_0000_4106_208C,
    0x0800_8080_0040_0020, 0x0804_8880_2000_4004, 0x8400_8080_1000_2002, 0x0200_2200_0A00_1040,
    0x4048_8080_0400_0800, 0x4011_0100_0208_0400, 0x0026_0040_4001_0080, 0x0144_0200_0400_40A1,
    0x0008_8024_8000_4002, 0x0004_2004_C001_5001, 0x1000_2001_0011_0040, 0x0000_0822_0042_0010,
    0x0081_0033_0004_0800, 0x438A_0012_0008_3450, 0x0045_5014_0003_0822, 0x1804_0042_0002_840F,
    0x8000_4000_8880_0020, 0x0142_0080_2200_4100, 0x0321_0010_4100_2000, 0x2030_0804_8080_1000,
    0x0140_0408_0100_1100, 0x1002_0002_8080_0400, 0x0000_8002_0080_0100, 0x0000_0100_4200_0084,
    0x4000_E080_4001_8000, 0x0010_0020_0040_4000, 0x0040_2000_1101_0040, 0x0800_0800_1000_8080,
    0x0000_0800_0400_8080, 0xA820_0200_0400_8080, 0x0240_0102_0804_0010, 0x00E4_0400_6082_0001,
    0x8100_4100_8000_2300, 0x0180_8040_0021_0100, 0x1000_6002_8010_0280, 0x0010_0008_0044_0040,
    0x0002_1800_0400_8280, 0x0070_0200_8004_0080, 0x0000_0110_0208_0400, 0x0020_8031_4B00_0080,
    0x0025_4A00_2031_0082, 0x0B02_4500_1422_0082, 0x1408_2000_0843_0093, 0x0800_A100_0885_1001,
    0x0692_0020_1008_0402, 0x0002_0048_0C10_011A, 0x8511_0000_8402_0041, 0x2000_0844_0039_0082,
];

pub(crate) static WHITE_DOUBLE_PUSH_MAGICS: [u64; 64] = [
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x2001_8041_1001_0000, 0x4080_2040_0104_4000, 0x0080_6010_0003_0022, 0x0000_0810_8100_0400,
    0x8402_0504_10B0_0002, 0x0000_530A_020C_0108, 0x0000_8105_0000_8010, 0x0200_0940_8020_0004,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
];

pub(crate) static BLACK_DOUBLE_PUSH_MAGICS: [u64; 64] = [
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x2600_0000_5A80_0010, 0x1010_4100_A020_0040, 0x0000_0000_6011_8090, 0x6040_0010_102C_0802,
    0x8000_8118_0408_0020, 0x4800_0000_0402_0A89, 0x08BB_0201_0501_2000, 0x4080_8844_2085_0010,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
    0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000, 0x0000_0000_0000_0000,
];

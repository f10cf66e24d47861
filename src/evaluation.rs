// The granularity of evaluation in this engine is in centipawns.

use std::ops::{Add, AddAssign, Neg, Sub};

use crate::{
    chess::{
        piece::{Colour, PieceType},
        position::Position,
        types::Square,
    },
    search::MAX_PLY,
};

/// The value of checkmate.
/// To recover depth-to-mate, we subtract depth (ply) from this value.
/// e.g. if white has a mate in two ply, the output from a depth-5 search will be
/// two less than `MATE_SCORE`.
pub const MATE_SCORE: i32 = i16::MAX as i32 - 300;
/// Strictly greater than any score a search can return.
pub const INFINITY: i32 = MATE_SCORE + 1;

pub const fn mate_in(ply: usize) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    debug_assert!(ply <= MAX_PLY);
    MATE_SCORE - ply as i32
}
pub const fn mated_in(ply: usize) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    debug_assert!(ply <= MAX_PLY);
    -MATE_SCORE + ply as i32
}

/// A threshold over which scores must be mate.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const MINIMUM_MATE_SCORE: i32 = MATE_SCORE - MAX_PLY as i32;

pub const fn is_mate_score(score: i32) -> bool {
    score.abs() >= MINIMUM_MATE_SCORE
}

/// Formats a score the way engines report them: `cp 35`, `mate 3` or `mate -2`.
pub fn format_score(score: i32) -> String {
    if is_mate_score(score) {
        let plies_to_mate = MATE_SCORE - score.abs();
        let moves_to_mate = (plies_to_mate + 1) / 2;
        let signed = if score > 0 { moves_to_mate } else { -moves_to_mate };
        format!("mate {signed}")
    } else {
        format!("cp {score}")
    }
}

/// Scores a position in centipawns from the point of view of the side to move.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, pos: &Position<'_>) -> i32;
}

/// A middlegame / endgame score pair.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct S(pub i32, pub i32);

impl S {
    pub const NULL: Self = Self(0, 0);

    /// Blends the pair by `phase`, which runs from 0 (opening) to 256 (endgame).
    pub const fn value(self, phase: i32) -> i32 {
        self.0 * (256 - phase) / 256 + self.1 * phase / 256
    }
}

impl Add for S {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl Sub for S {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl AddAssign for S {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.1 += rhs.1;
    }
}

impl Neg for S {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0, -self.1)
    }
}

#[rustfmt::skip]
const PIECE_VALUES: [S; 6] = [
    S(82, 94), S(337, 281), S(365, 297), S(477, 512), S(1025, 936), S::NULL,
];

const KNIGHT_PHASE: i32 = 1;
const BISHOP_PHASE: i32 = 1;
const ROOK_PHASE: i32 = 2;
const QUEEN_PHASE: i32 = 4;
const TOTAL_PHASE: i32 = 4 * KNIGHT_PHASE + 4 * BISHOP_PHASE + 4 * ROOK_PHASE + 2 * QUEEN_PHASE;

// Scores are explicit for files A to D, implicitly mirrored for E to H.
const BONUS: [[[S; 4]; 8]; 5] = [
    [
        // Knight
        [S(-148, -69), S(-65, -41), S(-53, -42), S(-61, -2)],
        [S(-56, -40), S(-68, -28), S(-34, -19), S(-13, -19)],
        [S(-55, -30), S(-11, -21), S(-21, -13), S(4, 25)],
        [S(-21, -10), S(22, 23), S(18, 39), S(22, 39)],
        [S(-7, -18), S(36, 11), S(56, 36), S(41, 57)],
        [S(18, -24), S(49, -17), S(85, 11), S(80, 35)],
        [S(-40, -42), S(0, -23), S(31, -24), S(64, 39)],
        [S(-174, -73), S(-56, -61), S(-29, -29), S(1, 10)],
    ],
    [
        // Bishop
        [S(-19, -25), S(23, 1), S(-11, -5), S(-35, -8)],
        [S(16, -18), S(9, -23), S(13, -20), S(-24, -8)],
        [S(-12, -22), S(12, -18), S(-26, -2), S(-7, 16)],
        [S(23, -29), S(-2, -27), S(-9, 0), S(17, 10)],
        [S(-6, 12), S(0, 1), S(34, -15), S(34, 8)],
        [S(16, 6), S(31, 10), S(28, 15), S(35, -14)],
        [S(15, 5), S(-15, 13), S(21, -10), S(0, 12)],
        [S(-26, -5), S(1, -4), S(-16, 1), S(-32, 4)],
    ],
    [
        // Rook
        [S(-9, -31), S(-2, -39), S(-24, 3), S(-20, -16)],
        [S(-48, -28), S(-20, -29), S(-30, -28), S(-21, -29)],
        [S(-34, 0), S(5, -30), S(-28, -14), S(-24, -33)],
        [S(-12, 21), S(-1, -4), S(-21, 4), S(-33, 11)],
        [S(0, 22), S(12, 18), S(-3, 31), S(25, 21)],
        [S(4, 30), S(25, 17), S(33, 20), S(27, 32)],
        [S(12, 31), S(16, 32), S(15, 45), S(45, 22)],
        [S(10, 25), S(8, 0), S(24, 35), S(33, 23)],
    ],
    [
        // Queen
        [S(-13, -75), S(-25, -76), S(-32, -74), S(-10, -51)],
        [S(7, -81), S(-10, -58), S(-14, -49), S(-15, -31)],
        [S(1, -64), S(-4, -38), S(-14, -18), S(-20, -24)],
        [S(8, -31), S(11, -2), S(-3, -2), S(-19, 29)],
        [S(0, -2), S(14, 17), S(16, 33), S(-3, 48)],
        [S(23, -11), S(37, 9), S(33, 16), S(35, 28)],
        [S(22, -23), S(-21, 0), S(36, 3), S(30, 18)],
        [S(25, -60), S(25, -31), S(28, -16), S(25, -7)],
    ],
    [
        // King
        [S(56, -72), S(60, -25), S(14, -16), S(-15, 3)],
        [S(28, -7), S(36, 7), S(-33, 38), S(-72, 45)],
        [S(-72, 7), S(-9, 29), S(-98, 68), S(-104, 78)],
        [S(-96, 41), S(-74, 68), S(-117, 98), S(-118, 115)],
        [S(-61, 49), S(-59, 90), S(-109, 131), S(-143, 136)],
        [S(-90, 45), S(-68, 125), S(-132, 137), S(-182, 144)],
        [S(-125, 0), S(-93, 74), S(-148, 69), S(-180, 84)],
        [S(-154, -36), S(-124, 12), S(-168, 26), S(-214, 31)],
    ],
];

#[rustfmt::skip]
const P_BONUS: [[S; 8]; 8] = [
    // Pawn (asymmetric distribution)
    [ S::NULL; 8 ],
    [ S(-18, 14), S(-22, 21), S(-7, 35), S(20, 31), S(22, 26), S(44, 30), S(34, 9), S(2, 0), ],
    [ S(-26, -4), S(-19, 13), S(-12, 9), S(6, 12), S(21, 16), S(11, 29), S(22, 1), S(-4, 0), ],
    [ S(-28, 18), S(-31, 26), S(0, 6), S(7, -6), S(12, -5), S(22, 14), S(18, 16), S(10, 3), ],
    [ S(0, 39), S(-13, 33), S(-4, 28), S(8, -21), S(28, 8), S(0, 23), S(15, 41), S(32, 23), ],
    [ S(19, 54), S(6, 45), S(19, 46), S(20, 15), S(19, 54), S(22, 36), S(13, 35), S(16, 41), ],
    [ S(20, 26), S(33, 13), S(25, 40), S(16, 49), S(31, 51), S(13, 44), S(37, 34), S(-3, 34), ],
    [ S::NULL; 8 ],
];

/// Material plus piece-square bonus for a piece of `colour` standing on `sq`.
fn placement(piece_type: PieceType, colour: Colour, sq: Square) -> S {
    let sq = sq.relative_to(colour);
    let rank = sq.rank() as usize;
    let file = sq.file() as usize;
    let bonus = match piece_type {
        PieceType::Pawn => P_BONUS[rank][file],
        _ => BONUS[piece_type.index() - 1][rank][file.min(7 - file)],
    };
    PIECE_VALUES[piece_type.index()] + bonus
}

/// Material and piece-square tables, tapered between middlegame and endgame by the
/// non-pawn material left on the board.
#[derive(Clone, Copy, Debug, Default)]
pub struct PieceSquareEvaluator;

impl PieceSquareEvaluator {
    /// 0 with all pieces on the board, 256 with none.
    pub fn phase(pos: &Position<'_>) -> i32 {
        #![allow(clippy::cast_possible_wrap)]
        let board = pos.board();
        let count = |pt: PieceType| board.of_type(pt).count() as i32;
        let remaining = KNIGHT_PHASE * count(PieceType::Knight)
            + BISHOP_PHASE * count(PieceType::Bishop)
            + ROOK_PHASE * count(PieceType::Rook)
            + QUEEN_PHASE * count(PieceType::Queen);
        (TOTAL_PHASE - remaining.min(TOTAL_PHASE)) * 256 / TOTAL_PHASE
    }
}

impl Evaluator for PieceSquareEvaluator {
    fn evaluate(&self, pos: &Position<'_>) -> i32 {
        let board = pos.board();
        if board.is_material_draw() {
            return 0;
        }
        let mut total = S::NULL;
        board.visit_pieces(|sq, piece| {
            let score = placement(piece.piece_type(), piece.colour(), sq);
            if piece.colour() == Colour::White {
                total += score;
            } else {
                total += -score;
            }
        });
        let white_relative = total.value(Self::phase(pos));
        if pos.turn() == Colour::White { white_relative } else { -white_relative }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(fen: &str) -> i32 {
        PieceSquareEvaluator.evaluate(&Position::from_fen(fen).unwrap())
    }

    #[test]
    fn startpos_is_level() {
        assert_eq!(eval(Position::STARTING_FEN), 0);
        assert_eq!(PieceSquareEvaluator::phase(&Position::startpos()), 0);
    }

    #[test]
    fn scores_are_side_relative() {
        let white = eval("4k3/8/8/8/8/8/8/3QK3 w - - 0 1");
        let black = eval("4k3/8/8/8/8/8/8/3QK3 b - - 0 1");
        assert!(white > 800, "{white}");
        assert_eq!(white, -black);
    }

    #[test]
    fn colours_are_mirrored() {
        let white = eval("4k3/8/8/8/3N4/8/2P5/4K3 w - - 0 1");
        let black = eval("4k3/2p5/8/3n4/8/8/8/4K3 b - - 0 1");
        assert_eq!(white, black);
    }

    #[test]
    fn insufficient_material_is_drawn() {
        assert_eq!(eval("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1"), 0);
        assert_eq!(eval("4k3/8/8/2n5/8/8/8/2B1K3 b - - 0 1"), 0);
        assert_ne!(eval("4k3/8/8/8/8/8/8/1BB1K3 w - - 0 1"), 0);
    }

    #[test]
    fn mate_scores_format_in_moves() {
        assert_eq!(format_score(mate_in(1)), "mate 1");
        assert_eq!(format_score(mate_in(3)), "mate 2");
        assert_eq!(format_score(mated_in(2)), "mate -1");
        assert_eq!(format_score(mated_in(0)), "mate 0");
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(-120), "cp -120");
        assert!(is_mate_score(mate_in(40)));
        assert!(!is_mate_score(2_000));
        assert!(INFINITY > mate_in(0));
    }
}

//! Attack lookups. Leapers and pawns come from compile-time tables, sliders and
//! double pushes from the magic tables.

use crate::chess::{
    magic::{BISHOP_TABLE, BLACK_DOUBLE_PUSH_TABLE, ROOK_TABLE, WHITE_DOUBLE_PUSH_TABLE},
    piece::{Colour, PieceType},
    squareset::SquareSet,
    types::Square,
};

const KNIGHT_DELTAS: [i8; 8] = [17, 15, 10, 6, -17, -15, -10, -6];
const KING_DELTAS: [i8; 8] = [9, 8, 7, 1, -9, -8, -7, -1];
const PAWN_CAPTURE_DELTAS: [[i8; 2]; 2] = [[7, 9], [-7, -9]];

/// Targets of `deltas` from every square, discarding any that wrap around a board edge.
const fn init_stepping_attacks<const N: usize>(deltas: &[i8; N]) -> [SquareSet; 64] {
    let mut attacks = [SquareSet::EMPTY; 64];
    cfor!(let mut index = 0; index < 64; index += 1; {
        let Some(sq) = Square::new(index) else { break };
        let mut attacks_bb = SquareSet::EMPTY;
        cfor!(let mut i = 0; i < N; i += 1; {
            if let Some(target) = sq.offset(deltas[i]) {
                // no leaper or pawn move changes file by more than two.
                if sq.file().abs_diff(target.file()) <= 2 {
                    attacks_bb = attacks_bb.add_square(target);
                }
            }
        });
        attacks[index as usize] = attacks_bb;
    });
    attacks
}

const fn init_single_pushes(delta: i8) -> [SquareSet; 64] {
    let mut pushes = [SquareSet::EMPTY; 64];
    cfor!(let mut index = 0; index < 64; index += 1; {
        let Some(sq) = Square::new(index) else { break };
        if let Some(target) = sq.offset(delta) {
            pushes[index as usize] = target.as_set();
        }
    });
    pushes
}

static KNIGHT_ATTACKS: [SquareSet; 64] = init_stepping_attacks(&KNIGHT_DELTAS);
static KING_ATTACKS: [SquareSet; 64] = init_stepping_attacks(&KING_DELTAS);
static PAWN_ATTACKS: [[SquareSet; 64]; 2] = [
    init_stepping_attacks(&PAWN_CAPTURE_DELTAS[0]),
    init_stepping_attacks(&PAWN_CAPTURE_DELTAS[1]),
];
static PAWN_PUSHES: [[SquareSet; 64]; 2] = [init_single_pushes(8), init_single_pushes(-8)];

/// Builds the lazily-initialised tables now, so the first search does not pay for them.
pub fn init() {
    let regenerated = BISHOP_TABLE.regenerated()
        + ROOK_TABLE.regenerated()
        + WHITE_DOUBLE_PUSH_TABLE.regenerated()
        + BLACK_DOUBLE_PUSH_TABLE.regenerated();
    tracing::debug!(regenerated, "attack tables ready");
}

pub fn knight_attacks(sq: Square) -> SquareSet {
    KNIGHT_ATTACKS[sq]
}

pub fn king_attacks(sq: Square) -> SquareSet {
    KING_ATTACKS[sq]
}

/// Squares a pawn of `colour` on `sq` captures on.
pub fn pawn_attacks(colour: Colour, sq: Square) -> SquareSet {
    PAWN_ATTACKS[colour][sq]
}

/// The single-push target of a pawn of `colour` on `sq`, ignoring occupancy.
pub fn pawn_push(colour: Colour, sq: Square) -> SquareSet {
    PAWN_PUSHES[colour][sq]
}

/// The double-push target of a pawn of `colour` on `sq`, or nothing if the pawn is off its
/// starting rank or either square ahead is occupied.
pub fn double_push(colour: Colour, sq: Square, occupied: SquareSet) -> SquareSet {
    match colour {
        Colour::White => WHITE_DOUBLE_PUSH_TABLE.lookup(sq, occupied),
        Colour::Black => BLACK_DOUBLE_PUSH_TABLE.lookup(sq, occupied),
    }
}

pub fn bishop_attacks(sq: Square, blockers: SquareSet) -> SquareSet {
    BISHOP_TABLE.lookup(sq, blockers)
}

pub fn rook_attacks(sq: Square, blockers: SquareSet) -> SquareSet {
    ROOK_TABLE.lookup(sq, blockers)
}

pub fn queen_attacks(sq: Square, blockers: SquareSet) -> SquareSet {
    bishop_attacks(sq, blockers) | rook_attacks(sq, blockers)
}

/// Attacks of a non-pawn piece.
pub fn attacks_by_type(pt: PieceType, sq: Square, blockers: SquareSet) -> SquareSet {
    match pt {
        PieceType::Pawn => panic!("pawn attacks depend on colour, use pawn_attacks"),
        PieceType::Knight => knight_attacks(sq),
        PieceType::Bishop => bishop_attacks(sq, blockers),
        PieceType::Rook => rook_attacks(sq, blockers),
        PieceType::Queen => queen_attacks(sq, blockers),
        PieceType::King => king_attacks(sq),
    }
}

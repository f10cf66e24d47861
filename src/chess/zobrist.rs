//! Zobrist keys and hashing helpers.
//!
//! The keys are generated at compile time from a fixed-seed xorshift stream, so hashes
//! are stable across runs.

#![allow(clippy::cast_possible_truncation)]

use crate::{
    chess::{
        piece::{Colour, Piece},
        piecelayout::PieceLayout,
        types::{CastlingRights, Square},
    },
    rng::XorShiftState,
};

struct Keys {
    pieces: [[u64; 64]; 12],
    ep_files: [u64; 8],
    castling: [u64; 16],
    side: u64,
}

const fn init_hash_keys() -> Keys {
    let mut state = XorShiftState::new();
    let mut pieces = [[0; 64]; 12];
    cfor!(let mut index = 0; index < 12; index += 1; {
        cfor!(let mut sq = 0; sq < 64; sq += 1; {
            let key;
            (key, state) = state.next_self();
            pieces[index][sq] = key;
        });
    });
    let mut ep_files = [0; 8];
    cfor!(let mut file = 0; file < 8; file += 1; {
        let key;
        (key, state) = state.next_self();
        ep_files[file] = key;
    });
    let mut castling = [0; 16];
    cfor!(let mut index = 0; index < 16; index += 1; {
        let key;
        (key, state) = state.next_self();
        castling[index] = key;
    });
    let (side, _) = state.next_self();
    Keys {
        pieces,
        ep_files,
        castling,
        side,
    }
}

const KEYS: Keys = init_hash_keys();

pub static PIECE_KEYS: [[u64; 64]; 12] = KEYS.pieces;
pub static EP_KEYS: [u64; 8] = KEYS.ep_files;
pub static CASTLE_KEYS: [u64; 16] = KEYS.castling;
pub const SIDE_KEY: u64 = KEYS.side;

pub fn piece_square(piece: Piece, sq: Square) -> u64 {
    PIECE_KEYS[piece][sq]
}

pub fn castling(rights: CastlingRights) -> u64 {
    CASTLE_KEYS[rights.index()]
}

/// En-passant targets hash by file only.
pub fn en_passant(ep: Option<Square>) -> u64 {
    ep.map_or(0, |sq| EP_KEYS[sq.file()])
}

pub const fn side(turn: Colour) -> u64 {
    match turn {
        Colour::White => 0,
        Colour::Black => SIDE_KEY,
    }
}

/// Hashes a position from scratch.
pub fn full(
    board: &PieceLayout,
    turn: Colour,
    rights: CastlingRights,
    ep: Option<Square>,
) -> u64 {
    let mut key = 0;
    board.visit_pieces(|sq, piece| key ^= piece_square(piece, sq));
    key ^ side(turn) ^ castling(rights) ^ en_passant(ep)
}

/// Piece-placement part of the difference between two boards: the XOR of the keys for
/// every square whose occupant changed.
pub fn placement_delta(before: &PieceLayout, after: &PieceLayout) -> u64 {
    let mut key = 0;
    before.diff(after, |sq, piece| key ^= piece_square(piece, sq));
    key
}

//! Move ordering.
//!
//! Each orderer claims the moves it recognises, moves them (sorted) to the front of the
//! slice it is given and reports how many it claimed. The next orderer in the chain then
//! works on what is left, so unclaimed moves keep their generation order at the tail.

use std::cmp::Reverse;

use arrayvec::ArrayVec;

use crate::chess::{
    chessmove::Move,
    movegen::MAX_POSITION_MOVES,
    piece::{Piece, PieceType},
    position::Position,
};

pub trait MoveOrderer: Send + Sync {
    /// Reorders a prefix of `moves` and returns its length.
    fn order(&self, pos: &Position<'_>, moves: &mut [Move]) -> usize;
}

/// Stable partition: moves matching `pred` first, the rest after, both in original order.
fn partition(moves: &mut [Move], pred: impl Fn(Move) -> bool) -> usize {
    let mut hits = ArrayVec::<Move, MAX_POSITION_MOVES>::new();
    let mut misses = ArrayVec::<Move, MAX_POSITION_MOVES>::new();
    for &m in moves.iter() {
        if pred(m) {
            hits.push(m);
        } else {
            misses.push(m);
        }
    }
    let claimed = hits.len();
    moves[..claimed].copy_from_slice(&hits);
    moves[claimed..].copy_from_slice(&misses);
    claimed
}

/// Promotions first, most valuable new piece first.
#[derive(Clone, Copy, Debug, Default)]
pub struct Promotions;

impl MoveOrderer for Promotions {
    fn order(&self, _: &Position<'_>, moves: &mut [Move]) -> usize {
        let claimed = partition(moves, Move::is_promo);
        moves[..claimed].sort_by_key(|m| Reverse(m.promotion_type()));
        claimed
    }
}

/// Captures by most valuable victim, then least valuable attacker.
#[derive(Clone, Copy, Debug, Default)]
pub struct MvvLva;

impl MvvLva {
    fn key(pos: &Position<'_>, m: Move) -> (Reverse<PieceType>, PieceType) {
        let victim = if m.is_ep() {
            PieceType::Pawn
        } else {
            pos.piece_at(m.to()).map_or(PieceType::Pawn, Piece::piece_type)
        };
        let attacker = pos.piece_at(m.from()).map_or(PieceType::Pawn, Piece::piece_type);
        (Reverse(victim), attacker)
    }
}

impl MoveOrderer for MvvLva {
    fn order(&self, pos: &Position<'_>, moves: &mut [Move]) -> usize {
        let claimed = partition(moves, Move::is_capture);
        moves[..claimed].sort_by_key(|&m| Self::key(pos, m));
        claimed
    }
}

/// A sequence of orderers, each applied to whatever the previous ones left unclaimed.
pub struct OrderingChain {
    orderers: Vec<Box<dyn MoveOrderer>>,
}

impl OrderingChain {
    pub fn new(orderers: Vec<Box<dyn MoveOrderer>>) -> Self {
        Self { orderers }
    }

    pub fn order(&self, pos: &Position<'_>, moves: &mut [Move]) {
        let mut start = 0;
        for orderer in &self.orderers {
            if start >= moves.len() {
                break;
            }
            start += orderer.order(pos, &mut moves[start..]);
        }
    }
}

impl Default for OrderingChain {
    /// Promotions, then captures.
    fn default() -> Self {
        Self::new(vec![Box::new(Promotions), Box::new(MvvLva)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordered(fen: &str) -> Vec<String> {
        let pos = Position::from_fen(fen).unwrap();
        let mut moves = pos.legal_moves();
        OrderingChain::default().order(&pos, &mut moves);
        moves.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn promotions_then_captures_then_the_rest() {
        // the b7 pawn can promote quietly or by taking the rook; the knight can take the
        // queen or the c2 pawn, the rook can take the queen.
        let moves = ordered("r3k3/1P6/8/3q4/8/4N3/2p5/3RK3 w - - 0 1");
        assert_eq!(
            &moves[..8],
            ["b7b8q", "b7a8q", "b7b8r", "b7a8r", "b7b8b", "b7a8b", "b7b8n", "b7a8n"]
        );
        assert_eq!(&moves[8..11], ["e3d5", "d1d5", "e3c2"]);
        // quiets keep generation order: knight moves precede rook and king moves.
        assert!(moves[11].starts_with("e3"));
    }

    #[test]
    fn ties_go_to_the_cheaper_attacker() {
        let moves = ordered("4k3/8/8/3r4/2P5/4N3/8/4K3 w - - 0 1");
        assert_eq!(&moves[..2], ["c4d5", "e3d5"]);
    }

    #[test]
    fn en_passant_counts_as_a_pawn_capture() {
        let moves = ordered("4k3/8/8/3pP3/8/8/8/4K2R w K d6 0 2");
        assert_eq!(moves[0], "e5d6");
    }
}

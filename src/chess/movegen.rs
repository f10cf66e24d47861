//! Pseudo-legal move generation.
//!
//! Moves that leave the mover's king attacked are generated and must be filtered by the
//! caller, with the exception of castling, which is only emitted when it is fully legal.

use arrayvec::ArrayVec;

use crate::chess::{
    attacks,
    chessmove::{Move, MoveKind},
    piece::{Black, Col, Colour, Piece, PieceType, White},
    position::Position,
    squareset::SquareSet,
    types::Square,
};

/// Upper bound on the pseudo-legal moves of any position.
pub const MAX_POSITION_MOVES: usize = 256;

pub type MoveList = ArrayVec<Move, MAX_POSITION_MOVES>;

fn push_targets(moves: &mut MoveList, from: Square, targets: SquareSet, them: SquareSet) {
    for to in targets {
        moves.push(Move::new(from, to, MoveKind::Normal, them.contains_square(to)));
    }
}

fn push_promotions(moves: &mut MoveList, from: Square, to: Square, capture: bool) {
    for promo in PieceType::PROMOTIONS {
        moves.push(Move::new_promotion(from, to, promo, capture));
    }
}

impl Position<'_> {
    /// Fills `moves` with every pseudo-legal move, replacing its previous contents.
    ///
    /// The order is fixed: pawns (non-promoting, then promoting), knights, bishops, rooks,
    /// queens, king steps and finally castling.
    pub fn generate_moves(&self, moves: &mut MoveList) {
        moves.clear();
        match self.turn() {
            Colour::White => self.generate_moves_for::<White>(moves),
            Colour::Black => self.generate_moves_for::<Black>(moves),
        }
    }

    fn generate_moves_for<C: Col>(&self, moves: &mut MoveList) {
        let board = self.board();
        let us = board.colour(C::COLOUR);
        let them = board.colour(C::Opposite::COLOUR);
        let occupied = board.occupied();
        let freedom = !us;
        let ours = |pt: PieceType| board.piece_bb(Piece::new(C::COLOUR, pt));

        let pawns = ours(PieceType::Pawn);
        self.generate_pawn_moves::<C>(pawns & !C::PROMO_RANK, them, occupied, moves);
        Self::generate_promotions::<C>(pawns & C::PROMO_RANK, them, occupied, moves);

        for from in ours(PieceType::Knight) {
            push_targets(moves, from, attacks::knight_attacks(from) & freedom, them);
        }
        for from in ours(PieceType::Bishop) {
            push_targets(moves, from, attacks::bishop_attacks(from, occupied) & freedom, them);
        }
        for from in ours(PieceType::Rook) {
            push_targets(moves, from, attacks::rook_attacks(from, occupied) & freedom, them);
        }
        // queens go through both slider tables separately.
        for from in ours(PieceType::Queen) {
            push_targets(moves, from, attacks::bishop_attacks(from, occupied) & freedom, them);
            push_targets(moves, from, attacks::rook_attacks(from, occupied) & freedom, them);
        }
        for from in ours(PieceType::King) {
            push_targets(moves, from, attacks::king_attacks(from) & freedom, them);
        }

        self.generate_castling::<C>(moves);
    }

    /// Pushes, double pushes, en passant and captures for pawns that cannot promote.
    fn generate_pawn_moves<C: Col>(
        &self,
        pawns: SquareSet,
        them: SquareSet,
        occupied: SquareSet,
        moves: &mut MoveList,
    ) {
        let ep_target = self.ep_sq().map_or(SquareSet::EMPTY, Square::as_set);
        for from in pawns {
            for to in attacks::pawn_push(C::COLOUR, from) & !occupied {
                moves.push(Move::new(from, to, MoveKind::Normal, false));
            }
            for to in attacks::double_push(C::COLOUR, from, occupied) {
                moves.push(Move::new(from, to, MoveKind::DoublePush, false));
            }
            let captures = attacks::pawn_attacks(C::COLOUR, from);
            for to in captures & ep_target {
                moves.push(Move::new(from, to, MoveKind::EnPassant, true));
            }
            for to in captures & them {
                moves.push(Move::new(from, to, MoveKind::Normal, true));
            }
        }
    }

    fn generate_promotions<C: Col>(
        pawns: SquareSet,
        them: SquareSet,
        occupied: SquareSet,
        moves: &mut MoveList,
    ) {
        for from in pawns {
            for to in attacks::pawn_push(C::COLOUR, from) & !occupied {
                push_promotions(moves, from, to, false);
            }
            for to in attacks::pawn_attacks(C::COLOUR, from) & them {
                push_promotions(moves, from, to, true);
            }
        }
    }

    /// Castling is checked in full here: the right is held, the rook is home, the path is
    /// clear, the king is not in check, and neither the transit nor the landing square
    /// is attacked.
    fn generate_castling<C: Col>(&self, moves: &mut MoveList) {
        let rights = self.castling_rights();
        let kingside = rights.kingside(C::COLOUR);
        let queenside = rights.queenside(C::COLOUR);
        if !kingside && !queenside {
            return;
        }
        let board = self.board();
        if board.piece_at(C::KING_HOME) != Some(Piece::new(C::COLOUR, PieceType::King))
            || self.in_check()
        {
            return;
        }
        let rook = Some(Piece::new(C::COLOUR, PieceType::Rook));
        let occupied = board.occupied();
        let attacked = |sq: Square| board.sq_attacked(sq, C::Opposite::COLOUR);
        let rel = |sq: Square| sq.relative_to(C::COLOUR);

        if kingside
            && board.piece_at(C::KINGSIDE_ROOK) == rook
            && (occupied & (rel(Square::F1).as_set() | rel(Square::G1).as_set())).is_empty()
            && !attacked(rel(Square::F1))
            && !attacked(rel(Square::G1))
        {
            moves.push(Move::new(C::KING_HOME, rel(Square::G1), MoveKind::Castle, false));
        }

        if queenside
            && board.piece_at(C::QUEENSIDE_ROOK) == rook
            && (occupied
                & (rel(Square::B1).as_set() | rel(Square::C1).as_set() | rel(Square::D1).as_set()))
            .is_empty()
            && !attacked(rel(Square::D1))
            && !attacked(rel(Square::C1))
        {
            moves.push(Move::new(C::KING_HOME, rel(Square::C1), MoveKind::Castle, false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(fen: &str) -> MoveList {
        let pos = Position::from_fen(fen).unwrap();
        let mut moves = MoveList::new();
        pos.generate_moves(&mut moves);
        moves
    }

    #[test]
    fn startpos_generation_order() {
        let moves = generated(Position::STARTING_FEN);
        assert_eq!(moves.len(), 20);
        let text: Vec<String> = moves.iter().map(ToString::to_string).collect();
        assert_eq!(&text[..4], ["a2a3", "a2a4", "b2b3", "b2b4"]);
        assert_eq!(&text[16..], ["b1a3", "b1c3", "g1f3", "g1h3"]);
        assert_eq!(moves[1].kind(), MoveKind::DoublePush);
    }

    #[test]
    fn promotions_come_in_fours_by_value() {
        let moves = generated("3qk3/2P5/8/8/8/8/8/4K3 w - - 0 1");
        let promos: Vec<String> = moves
            .iter()
            .filter(|m| m.is_promo())
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            promos,
            ["c7c8q", "c7c8r", "c7c8b", "c7c8n", "c7d8q", "c7d8r", "c7d8b", "c7d8n"]
        );
        assert!(moves.iter().filter(|m| m.is_promo()).skip(4).all(|m| m.is_capture()));
    }

    #[test]
    fn pseudo_legal_moves_include_self_checks() {
        // the pinned knight can still move; legality is the caller's job.
        let fen = "4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1";
        let moves = generated(fen);
        assert!(moves.iter().any(|m| m.from() == Square::E2));
        let legal = Position::from_fen(fen).unwrap().legal_moves();
        assert!(legal.iter().all(|m| m.from() != Square::E2));
    }

    #[test]
    fn castling_is_checked_at_generation() {
        let castles = |fen: &str| -> Vec<String> {
            generated(fen)
                .iter()
                .filter(|m| m.is_castle())
                .map(ToString::to_string)
                .collect()
        };
        assert_eq!(castles("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1"), ["e1g1", "e1c1"]);
        // f1 attacked: no kingside castle.
        assert_eq!(castles("r3k2r/8/8/8/8/8/5r2/R3K2R w KQkq - 0 1"), ["e1c1"]);
        // b1 attacked only: queenside castling is still allowed.
        assert_eq!(castles("r3k2r/8/8/8/8/8/1r6/R3K2R w KQkq - 0 1"), ["e1g1", "e1c1"]);
        // in check: nothing.
        assert!(castles("r3k2r/8/8/8/8/8/4r3/R3K2R w KQkq - 0 1").is_empty());
        // blocked path.
        assert_eq!(castles("r3k2r/8/8/8/8/8/8/RN2K1NR w KQkq - 0 1"), Vec::<String>::new());
        // no rights.
        assert!(castles("r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1").is_empty());
        assert_eq!(castles("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1"), ["e8g8", "e8c8"]);
    }

    #[test]
    fn en_passant_is_generated_once() {
        let moves = generated("4k3/8/8/2PpP3/8/8/8/4K3 w - d6 0 2");
        let ep: Vec<String> = moves.iter().filter(|m| m.is_ep()).map(ToString::to_string).collect();
        assert_eq!(ep, ["c5d6", "e5d6"]);
    }
}

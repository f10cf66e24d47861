use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use crate::{
    chess::{
        chessmove::{Move, MoveKind},
        fen::Fen,
        movegen::MoveList,
        piece::{Colour, Piece, PieceType},
        piecelayout::PieceLayout,
        types::{CastlingRights, Rank, Square},
        zobrist,
    },
    errors::FenParseError,
};

const CHECK_UNKNOWN: u8 = 0;
const CHECK_NO: u8 = 1;
const CHECK_YES: u8 = 2;

/// How a position reaches the one it was derived from.
#[derive(Clone)]
enum Parent<'p> {
    Root,
    /// A parent on the caller's stack, as used throughout search.
    Borrowed(&'p Position<'p>),
    /// A parent kept alive by reference counting, for game histories that outlive any frame.
    Shared(Arc<Position<'static>>),
}

/// A chess position, linked to the position it was derived from.
///
/// Positions are built either from a board description (and have no parent) or by
/// applying a move to a parent. Nothing about a position changes after it is built,
/// except that [`Position::apply_into`] may overwrite a caller-owned scratch position
/// wholesale.
pub struct Position<'p> {
    board: PieceLayout,
    side: Colour,
    castling: CastlingRights,
    ep: Option<Square>,
    /// Plies since the last capture or pawn move.
    halfmove: u16,
    /// Plies since the start of the game.
    ply: u32,
    hash: u64,
    repetitions: u8,
    in_check: AtomicU8,
    parent: Parent<'p>,
}

impl Clone for Position<'_> {
    fn clone(&self) -> Self {
        Self {
            board: self.board.clone(),
            side: self.side,
            castling: self.castling,
            ep: self.ep,
            halfmove: self.halfmove,
            ply: self.ply,
            hash: self.hash,
            repetitions: self.repetitions,
            in_check: AtomicU8::new(self.in_check.load(Ordering::Relaxed)),
            parent: self.parent.clone(),
        }
    }
}

impl Position<'static> {
    pub const STARTING_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// An empty board, used as the shell that [`Position::apply_into`] writes into.
    pub fn blank() -> Self {
        Self {
            board: PieceLayout::default(),
            side: Colour::White,
            castling: CastlingRights::NONE,
            ep: None,
            halfmove: 0,
            ply: 0,
            hash: 0,
            repetitions: 1,
            in_check: AtomicU8::new(CHECK_UNKNOWN),
            parent: Parent::Root,
        }
    }

    pub fn startpos() -> Self {
        match Self::from_fen(Self::STARTING_FEN) {
            Ok(pos) => pos,
            Err(e) => unreachable!("starting FEN failed to parse: {e}"),
        }
    }

    /// Builds a root position from a strict six-field FEN.
    pub fn from_fen(fen: &str) -> Result<Self, FenParseError> {
        Ok(Self::from_parsed_fen(&Fen::parse(fen)?))
    }

    pub fn from_parsed_fen(fen: &Fen) -> Self {
        let ply = (u32::from(fen.fullmove.get()) - 1) * 2 + u32::from(fen.turn == Colour::Black);
        Self {
            hash: zobrist::full(&fen.board, fen.turn, fen.castling, fen.ep),
            board: fen.board.clone(),
            side: fen.turn,
            castling: fen.castling,
            ep: fen.ep,
            halfmove: fen.halfmove,
            ply,
            repetitions: 1,
            in_check: AtomicU8::new(CHECK_UNKNOWN),
            parent: Parent::Root,
        }
    }

    /// Applies `m` to a reference-counted position. The child keeps its parent alive, so
    /// it can itself be shared and extended without borrowing from any stack frame.
    pub fn apply_shared(self: &Arc<Self>, m: Move) -> Self {
        let mut out = Self::blank();
        self.derive_into(m, Parent::Shared(Arc::clone(self)), &mut out);
        out
    }
}

impl<'p> Position<'p> {
    pub const fn board(&self) -> &PieceLayout {
        &self.board
    }

    pub const fn turn(&self) -> Colour {
        self.side
    }

    pub const fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    pub const fn ep_sq(&self) -> Option<Square> {
        self.ep
    }

    pub const fn halfmove_clock(&self) -> u16 {
        self.halfmove
    }

    pub const fn ply(&self) -> u32 {
        self.ply
    }

    pub const fn fullmove_number(&self) -> u32 {
        self.ply / 2 + 1
    }

    pub const fn hash(&self) -> u64 {
        self.hash
    }

    /// How many times this position has occurred in its reversible history, itself included.
    pub const fn repetitions(&self) -> u8 {
        self.repetitions
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board.piece_at(sq)
    }

    pub fn parent(&self) -> Option<&Self> {
        match &self.parent {
            Parent::Root => None,
            Parent::Borrowed(p) => Some(*p),
            Parent::Shared(p) => Some(&**p),
        }
    }

    pub fn is_square_attacked(&self, sq: Square, by: Colour) -> bool {
        self.board.sq_attacked(sq, by)
    }

    /// Whether the side to move is in check. Computed on first use and cached.
    pub fn in_check(&self) -> bool {
        match self.in_check.load(Ordering::Relaxed) {
            CHECK_YES => true,
            CHECK_NO => false,
            _ => {
                let check = self
                    .board
                    .king_sq(self.side)
                    .is_some_and(|king| self.board.sq_attacked(king, !self.side));
                self.in_check
                    .store(if check { CHECK_YES } else { CHECK_NO }, Ordering::Relaxed);
                check
            }
        }
    }

    /// Whether this position could have been reached by a legal move: each side has one
    /// king, and the side that just moved did not leave its king attacked.
    pub fn is_valid(&self) -> bool {
        let mover = !self.side;
        let kings = self.board.piece_bb(Piece::new(mover, PieceType::King));
        kings.one()
            && self.board.piece_bb(Piece::new(self.side, PieceType::King)).one()
            && kings
                .first()
                .is_some_and(|king| !self.board.sq_attacked(king, self.side))
    }

    /// Applies `m`, producing a child that borrows `self` as its parent.
    pub fn apply(&self, m: Move) -> Position<'_> {
        let mut out: Position<'_> = Position::blank();
        self.apply_into(m, &mut out);
        out
    }

    /// Applies `m`, overwriting `out` with the child position. Nothing of the previous
    /// contents of `out` survives.
    pub fn apply_into<'c>(&'c self, m: Move, out: &mut Position<'c>) {
        self.derive_into(m, Parent::Borrowed(self), out);
    }

    fn derive_into<'c>(&self, m: Move, parent: Parent<'c>, out: &mut Position<'c>) {
        assert!(m.is_well_formed(), "malformed move {m:?}");
        let from = m.from();
        let to = m.to();
        let us = self.side;
        let them = !us;
        let Some(piece) = self.board.piece_at(from) else {
            panic!("no piece on {from} to play {m:?} in {self}");
        };
        assert_eq!(piece.colour(), us, "{m:?} moves a {} piece with {us} to move", piece.colour());

        out.board.clone_from(&self.board);
        let board = &mut out.board;
        match (m.kind(), m.is_capture()) {
            (MoveKind::Normal | MoveKind::DoublePush, false) => board.relocate(from, to, piece),
            (MoveKind::Normal, true) => {
                let Some(victim) = self.board.piece_at(to) else {
                    panic!("{m:?} captures on the empty square {to}");
                };
                assert_eq!(victim.colour(), them, "{m:?} captures its own piece");
                board.remove(to, victim);
                board.relocate(from, to, piece);
            }
            (MoveKind::EnPassant, true) => {
                // the captured pawn stands beside the mover, on the destination file.
                let captured = Square::from_rank_file(from.rank(), to.file());
                board.remove(captured, Piece::new(them, PieceType::Pawn));
                board.relocate(from, to, piece);
            }
            (MoveKind::Promotion, capture) => {
                if capture {
                    let Some(victim) = self.board.piece_at(to) else {
                        panic!("{m:?} captures on the empty square {to}");
                    };
                    board.remove(to, victim);
                }
                let Some(promo) = m.promotion_type() else {
                    unreachable!("promotion without a piece type");
                };
                board.remove(from, piece);
                board.add(to, Piece::new(us, promo));
            }
            (MoveKind::Castle, false) => {
                let (rook_from, rook_to) = match to {
                    Square::G1 => (Square::H1, Square::F1),
                    Square::C1 => (Square::A1, Square::D1),
                    Square::G8 => (Square::H8, Square::F8),
                    Square::C8 => (Square::A8, Square::D8),
                    _ => panic!("castle {m:?} does not land on a castling square"),
                };
                board.relocate(from, to, piece);
                board.relocate(rook_from, rook_to, Piece::new(us, PieceType::Rook));
            }
            (kind, capture) => {
                unreachable!("{kind:?} with capture={capture} passed the form check")
            }
        }

        let castling = self.castling.after_move(from, to);
        let ep = if m.kind() == MoveKind::DoublePush {
            Square::new((from.inner() + to.inner()) / 2)
        } else {
            None
        };

        out.hash = self.hash
            ^ zobrist::placement_delta(&self.board, &out.board)
            ^ zobrist::castling(self.castling)
            ^ zobrist::castling(castling)
            ^ zobrist::en_passant(self.ep)
            ^ zobrist::en_passant(ep)
            ^ zobrist::SIDE_KEY;
        out.side = them;
        out.castling = castling;
        out.ep = ep;
        out.halfmove = if m.is_capture() || piece.piece_type() == PieceType::Pawn {
            0
        } else {
            self.halfmove.saturating_add(1)
        };
        out.ply = self.ply + 1;
        out.in_check = AtomicU8::new(CHECK_UNKNOWN);
        out.parent = parent;
        out.repetitions = out.count_repetitions();
    }

    /// Walks back over same-side ancestors within the reversible window, stopping at the
    /// first one with the same hash.
    fn count_repetitions(&self) -> u8 {
        let mut budget = self.halfmove;
        let mut cursor = self.parent().and_then(Self::parent);
        while budget >= 2 {
            let Some(ancestor) = cursor else { break };
            if ancestor.hash == self.hash {
                return ancestor.repetitions.saturating_add(1);
            }
            budget -= 2;
            cursor = ancestor.parent().and_then(Self::parent);
        }
        1
    }

    /// The legal moves in this position, in generation order.
    pub fn legal_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        self.generate_moves(&mut moves);
        let mut scratch: Position<'_> = Position::blank();
        moves.retain(|m| {
            self.apply_into(*m, &mut scratch);
            scratch.is_valid()
        });
        moves
    }

    pub fn is_legal(&self, m: Move) -> bool {
        self.legal_moves().contains(&m)
    }

    /// Recomputes the hash from scratch.
    pub fn compute_hash(&self) -> u64 {
        zobrist::full(&self.board, self.side, self.castling, self.ep)
    }

    /// Checks the internal invariants: the square-sets and mailbox agree, and the
    /// incremental hash matches a full recomputation.
    pub fn check_validity(&self) -> Result<(), String> {
        self.board.check_consistency()?;
        let full = self.compute_hash();
        if full != self.hash {
            return Err(format!(
                "hash is {:016X} but recomputes to {full:016X} in {self}",
                self.hash
            ));
        }
        if let Some(ep) = self.ep {
            let expected = match self.side {
                Colour::White => Rank::Six,
                Colour::Black => Rank::Three,
            };
            if ep.rank() != expected {
                return Err(format!("en passant square {ep} with {} to move", self.side));
            }
        }
        Ok(())
    }

    pub fn fen(&self) -> String {
        self.to_string()
    }

    /// The parsed-description form of this position.
    pub fn to_fen(&self) -> Fen {
        Fen {
            board: self.board.clone(),
            turn: self.side,
            castling: self.castling,
            ep: self.ep,
            halfmove: self.halfmove,
            fullmove: Fen::fullmove_from_ply(self.ply),
        }
    }
}

impl Display for Position<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

impl Debug for Position<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.to_string())
            .field("hash", &format_args!("{:016X}", self.hash))
            .field("repetitions", &self.repetitions)
            .field("root", &self.parent().is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(pos: &Arc<Position<'static>>, uci: &str) -> Arc<Position<'static>> {
        let m = pos.parse_uci(uci).unwrap();
        Arc::new(pos.apply_shared(m))
    }

    #[test]
    fn hash_and_board_stay_consistent() {
        fn walk(pos: &Position<'_>, depth: usize) {
            pos.check_validity().unwrap();
            if depth == 0 {
                return;
            }
            let mut moves = MoveList::new();
            pos.generate_moves(&mut moves);
            for &m in &moves {
                let child = pos.apply(m);
                walk(&child, depth - 1);
            }
        }
        for fen in [
            Position::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ] {
            walk(&Position::from_fen(fen).unwrap(), 3);
        }
    }

    #[test]
    fn double_push_sets_ep_and_other_moves_clear_it() {
        let pos = Position::startpos();
        let e4 = pos.apply(pos.parse_uci("e2e4").unwrap());
        assert_eq!(e4.ep_sq(), Some(Square::E3));
        assert_eq!(e4.turn(), Colour::Black);
        assert_eq!(e4.halfmove_clock(), 0);
        let nf6 = e4.apply(e4.parse_uci("g8f6").unwrap());
        assert_eq!(nf6.ep_sq(), None);
        assert_eq!(nf6.halfmove_clock(), 1);
        assert_eq!(nf6.fullmove_number(), 2);
        assert_eq!(
            nf6.fen(),
            "rnbqkb1r/pppppppp/5n2/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 1 2"
        );
        assert_eq!(nf6.parent().map(Position::hash), Some(e4.hash()));
    }

    #[test]
    fn en_passant_removes_the_passed_pawn() {
        let pos = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let m = pos.parse_uci("e5d6").unwrap();
        assert!(m.is_ep());
        let child = pos.apply(m);
        assert_eq!(child.piece_at(Square::D5), None);
        assert_eq!(child.piece_at(Square::D6), Some(Piece::WP));
        child.check_validity().unwrap();
    }

    #[test]
    fn castling_moves_the_rook_and_clears_rights() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let child = pos.apply(pos.parse_uci("e1g1").unwrap());
        assert_eq!(child.piece_at(Square::F1), Some(Piece::WR));
        assert_eq!(child.piece_at(Square::H1), None);
        assert_eq!(child.castling_rights().to_string(), "kq");
        let grandchild = child.apply(child.parse_uci("a8a1").unwrap());
        assert_eq!(grandchild.castling_rights().to_string(), "k");
        grandchild.check_validity().unwrap();
    }

    #[test]
    fn promotion_replaces_the_pawn() {
        let pos = Position::from_fen("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let child = pos.apply(pos.parse_uci("a7b8n").unwrap());
        assert_eq!(child.piece_at(Square::B8), Some(Piece::WN));
        assert_eq!(child.piece_at(Square::A7), None);
        assert!(child.board().piece_bb(Piece::BR).is_empty());
        child.check_validity().unwrap();
    }

    #[test]
    #[should_panic(expected = "malformed move")]
    fn malformed_move_is_rejected() {
        let pos = Position::startpos();
        let _ = pos.apply(Move::new(Square::E2, Square::E4, MoveKind::DoublePush, true));
    }

    #[test]
    #[should_panic(expected = "no piece on")]
    fn moving_from_an_empty_square_is_rejected() {
        let pos = Position::startpos();
        let _ = pos.apply(Move::new(Square::E4, Square::E5, MoveKind::Normal, false));
    }

    #[test]
    fn knight_shuffle_counts_repetitions() {
        let mut pos = Arc::new(Position::startpos());
        assert_eq!(pos.repetitions(), 1);
        for (cycle, expected) in [2, 3].into_iter().enumerate() {
            for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                pos = play(&pos, uci);
            }
            assert_eq!(pos.repetitions(), expected, "after cycle {cycle}");
            assert_eq!(pos.hash(), Position::startpos().hash());
        }
    }

    #[test]
    fn pawn_moves_restart_repetition_counting() {
        let mut pos = Arc::new(Position::startpos());
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            pos = play(&pos, uci);
        }
        assert_eq!(pos.repetitions(), 2);
        for uci in ["e2e3", "e7e6", "g1f3", "g8f6", "f3g1", "f6g8"] {
            pos = play(&pos, uci);
        }
        assert_eq!(pos.repetitions(), 2);
        assert_eq!(pos.halfmove_clock(), 4);
    }

    #[test]
    fn repetition_walk_stays_within_the_halfmove_clock() {
        let mut pos = Arc::new(Position::startpos());
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            pos = play(&pos, uci);
        }
        assert_eq!(pos.count_repetitions(), 2);
        let mut short = (*pos).clone();
        short.halfmove = 2;
        assert_eq!(short.count_repetitions(), 1);
        short.halfmove = 0;
        assert_eq!(short.count_repetitions(), 1);
    }

    #[test]
    fn check_detection_is_cached() {
        let pos = Position::from_fen("4k3/8/8/8/8/8/8/r3K3 w - - 0 1").unwrap();
        assert!(pos.in_check());
        assert!(pos.in_check());
        let clone = pos.clone();
        assert!(clone.in_check());
        assert!(!Position::startpos().in_check());
    }
}

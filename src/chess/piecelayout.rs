use crate::chess::{
    attacks,
    piece::{Colour, Piece, PieceType},
    squareset::SquareSet,
    types::Square,
};

/// Piece placement: one square-set per piece, per-colour and combined occupancy,
/// and a per-square mailbox kept in lockstep with the sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceLayout {
    pieces: [SquareSet; 12],
    colours: [SquareSet; 2],
    occupied: SquareSet,
    mailbox: [Option<Piece>; 64],
}

impl Default for PieceLayout {
    fn default() -> Self {
        Self {
            pieces: [SquareSet::EMPTY; 12],
            colours: [SquareSet::EMPTY; 2],
            occupied: SquareSet::EMPTY,
            mailbox: [None; 64],
        }
    }
}

impl PieceLayout {
    pub const fn occupied(&self) -> SquareSet {
        self.occupied
    }

    pub fn colour(&self, colour: Colour) -> SquareSet {
        self.colours[colour]
    }

    pub fn piece_bb(&self, piece: Piece) -> SquareSet {
        self.pieces[piece]
    }

    /// Both colours' pieces of one type.
    pub fn of_type(&self, piece_type: PieceType) -> SquareSet {
        self.pieces[Piece::new(Colour::White, piece_type)]
            | self.pieces[Piece::new(Colour::Black, piece_type)]
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.mailbox[sq]
    }

    pub fn king_sq(&self, colour: Colour) -> Option<Square> {
        self.pieces[Piece::new(colour, PieceType::King)].first()
    }

    /// Places `piece` on the empty square `sq`.
    pub fn add(&mut self, sq: Square, piece: Piece) {
        assert!(
            self.mailbox[sq].is_none(),
            "tried to place {piece} on occupied square {sq}"
        );
        let sq_bb = sq.as_set();
        self.pieces[piece] |= sq_bb;
        self.colours[piece.colour()] |= sq_bb;
        self.occupied |= sq_bb;
        self.mailbox[sq] = Some(piece);
    }

    /// Lifts `piece` off `sq`, which must hold exactly that piece.
    pub fn remove(&mut self, sq: Square, piece: Piece) {
        assert_eq!(
            self.mailbox[sq],
            Some(piece),
            "expected {piece} on {sq} but found {:?}",
            self.mailbox[sq]
        );
        let sq_bb = sq.as_set();
        self.pieces[piece] ^= sq_bb;
        self.colours[piece.colour()] ^= sq_bb;
        self.occupied ^= sq_bb;
        self.mailbox[sq] = None;
    }

    pub fn relocate(&mut self, from: Square, to: Square, piece: Piece) {
        self.remove(from, piece);
        self.add(to, piece);
    }

    /// Every piece of `attacker` that attacks `sq`, given the blockers in `occupied`.
    pub fn attackers_to(&self, sq: Square, attacker: Colour, occupied: SquareSet) -> SquareSet {
        let theirs = |pt| self.pieces[Piece::new(attacker, pt)];
        let diagonal = theirs(PieceType::Bishop) | theirs(PieceType::Queen);
        let orthogonal = theirs(PieceType::Rook) | theirs(PieceType::Queen);
        // a pawn of `attacker` hits `sq` exactly when a pawn of the other side on `sq`
        // would hit the pawn's square.
        (attacks::pawn_attacks(!attacker, sq) & theirs(PieceType::Pawn))
            | (attacks::knight_attacks(sq) & theirs(PieceType::Knight))
            | (attacks::bishop_attacks(sq, occupied) & diagonal)
            | (attacks::rook_attacks(sq, occupied) & orthogonal)
            | (attacks::king_attacks(sq) & theirs(PieceType::King))
    }

    /// Determines if `sq` is attacked by `side`.
    pub fn sq_attacked(&self, sq: Square, side: Colour) -> bool {
        self.attackers_to(sq, side, self.occupied).non_empty()
    }

    pub fn visit_pieces(&self, mut callback: impl FnMut(Square, Piece)) {
        for piece in Piece::all() {
            for sq in self.pieces[piece] {
                callback(sq, piece);
            }
        }
    }

    /// Calls `callback` for each (square, piece) that is added or removed from `self` to `target`.
    pub fn diff(&self, target: &Self, mut callback: impl FnMut(Square, Piece)) {
        for piece in Piece::all() {
            let changed = self.pieces[piece] ^ target.pieces[piece];
            for sq in changed {
                callback(sq, piece);
            }
        }
    }

    /// Returns true if neither side has enough material to force mate.
    pub fn is_material_draw(&self) -> bool {
        let heavy = self.of_type(PieceType::Pawn)
            | self.of_type(PieceType::Rook)
            | self.of_type(PieceType::Queen);
        if heavy.non_empty() {
            return false;
        }
        let minors = self.of_type(PieceType::Knight) | self.of_type(PieceType::Bishop);
        (minors & self.colours[Colour::White]).count() <= 1
            && (minors & self.colours[Colour::Black]).count() <= 1
    }

    /// Checks that the square-sets and the mailbox describe the same board.
    pub fn check_consistency(&self) -> Result<(), String> {
        if (self.colours[Colour::White] & self.colours[Colour::Black]).non_empty() {
            return Err("colour square-sets overlap".into());
        }
        if self.colours[Colour::White] | self.colours[Colour::Black] != self.occupied {
            return Err("colour square-sets do not cover the occupancy".into());
        }
        let mut seen = SquareSet::EMPTY;
        for piece in Piece::all() {
            let bb = self.pieces[piece];
            if (bb & seen).non_empty() {
                return Err(format!("{piece} square-set overlaps another piece"));
            }
            if (bb & !self.colours[piece.colour()]).non_empty() {
                return Err(format!("{piece} square-set escapes its colour"));
            }
            seen |= bb;
        }
        if seen != self.occupied {
            return Err("piece square-sets do not cover the occupancy".into());
        }
        for sq in Square::all() {
            let from_sets = Piece::all().find(|&p| self.pieces[p].contains_square(sq));
            if from_sets != self.mailbox[sq] {
                return Err(format!(
                    "mailbox says {:?} on {sq} but square-sets say {from_sets:?}",
                    self.mailbox[sq]
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kings() -> PieceLayout {
        let mut layout = PieceLayout::default();
        layout.add(Square::E1, Piece::WK);
        layout.add(Square::E8, Piece::BK);
        layout
    }

    #[test]
    fn add_remove_keeps_sets_in_lockstep() {
        let mut layout = kings();
        layout.add(Square::D4, Piece::WQ);
        layout.relocate(Square::D4, Square::H4, Piece::WQ);
        assert_eq!(layout.piece_at(Square::H4), Some(Piece::WQ));
        assert_eq!(layout.piece_at(Square::D4), None);
        assert!(layout.check_consistency().is_ok());
        assert_eq!(layout.occupied().count(), 3);
    }

    #[test]
    #[should_panic(expected = "expected")]
    fn removing_a_missing_piece_panics() {
        let mut layout = kings();
        layout.remove(Square::D4, Piece::WN);
    }

    #[test]
    fn attack_detection() {
        let mut layout = kings();
        layout.add(Square::A8, Piece::BR);
        layout.add(Square::D2, Piece::BP);
        assert!(layout.sq_attacked(Square::A1, Colour::Black));
        assert!(layout.sq_attacked(Square::E1, Colour::Black));
        assert!(layout.sq_attacked(Square::C1, Colour::Black));
        assert!(!layout.sq_attacked(Square::D1, Colour::Black));
        layout.add(Square::A4, Piece::WN);
        assert!(!layout.sq_attacked(Square::A1, Colour::Black));
    }

    #[test]
    fn material_draws() {
        let mut layout = kings();
        assert!(layout.is_material_draw());
        layout.add(Square::C3, Piece::WB);
        assert!(layout.is_material_draw());
        layout.add(Square::C4, Piece::WN);
        assert!(!layout.is_material_draw());
    }
}

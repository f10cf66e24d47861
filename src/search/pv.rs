use std::fmt::Display;

use arrayvec::ArrayVec;

use crate::{chess::chessmove::Move, search::MAX_PLY};

#[derive(Clone, Debug, Default)]
pub struct PVariation {
    pub(crate) score: i32,
    pub(crate) moves: ArrayVec<Move, MAX_PLY>,
}

impl PVariation {
    pub fn new() -> Self {
        Self { score: 0, moves: ArrayVec::new() }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub const fn score(&self) -> i32 {
        self.score
    }

    /// The first move of the line, or the null move if the line is empty.
    pub fn best_move(&self) -> Move {
        self.moves.first().copied().unwrap_or(Move::NULL)
    }

    pub(crate) fn load_from(&mut self, m: Move, rest: &Self) {
        self.moves.clear();
        self.moves.push(m);
        let room = self.moves.remaining_capacity();
        self.moves.extend(rest.moves.iter().copied().take(room));
    }
}

impl Display for PVariation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.moves.is_empty() {
            write!(f, "pv")?;
        }
        for &m in self.moves() {
            write!(f, " {m}")?;
        }
        Ok(())
    }
}

/// Triangular principal-variation table.
///
/// A move is recorded with [`PvTable::add`] before its subtree is searched, and only
/// becomes part of the line at that ply when [`PvTable::commit`] is called after the
/// subtree raised alpha. Commits at the root also refresh [`PvTable::root_line`].
pub struct PvTable {
    lines: Box<[PVariation]>,
    current: Box<[Move]>,
    root: PVariation,
}

impl PvTable {
    pub fn new() -> Self {
        Self {
            lines: vec![PVariation::new(); MAX_PLY + 1].into_boxed_slice(),
            current: vec![Move::NULL; MAX_PLY].into_boxed_slice(),
            root: PVariation::new(),
        }
    }

    /// Forgets the line at `ply`; called on entry to every node.
    pub fn clear(&mut self, ply: usize) {
        self.lines[ply].moves.clear();
    }

    pub fn add(&mut self, m: Move, ply: usize) {
        self.current[ply] = m;
    }

    /// Splices the line found one ply deeper onto the move last added at `ply`.
    pub fn commit(&mut self, ply: usize, score: i32) {
        let (head, tail) = self.lines.split_at_mut(ply + 1);
        head[ply].load_from(self.current[ply], &tail[0]);
        head[ply].score = score;
        if ply == 0 {
            self.root.clone_from(&head[0]);
        }
    }

    /// The best line found so far from the root, including lines from the iteration in progress.
    pub const fn root_line(&self) -> &PVariation {
        &self.root
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::{chessmove::MoveKind, types::Square};

    fn mv(from: Square, to: Square) -> Move {
        Move::new(from, to, MoveKind::Normal, false)
    }

    #[test]
    fn uncommitted_moves_stay_out_of_the_line() {
        let mut pv = PvTable::new();
        pv.clear(0);
        pv.add(mv(Square::E2, Square::E4), 0);
        pv.clear(1);
        pv.add(mv(Square::E7, Square::E5), 1);
        // the reply never raised alpha, so only the root move survives.
        pv.commit(0, 12);
        assert_eq!(pv.root_line().moves(), [mv(Square::E2, Square::E4)]);
        assert_eq!(pv.root_line().score(), 12);
    }

    #[test]
    fn commits_splice_deeper_lines() {
        let mut pv = PvTable::new();
        pv.clear(0);
        pv.add(mv(Square::D2, Square::D4), 0);
        pv.clear(1);
        pv.add(mv(Square::D7, Square::D5), 1);
        pv.clear(2);
        pv.add(mv(Square::C2, Square::C4), 2);
        pv.clear(3);
        pv.commit(2, 5);
        pv.commit(1, -5);
        pv.commit(0, 5);
        assert_eq!(pv.root_line().to_string(), "pv d2d4 d7d5 c2c4");

        // a later, worse root move that is merely added does not disturb the root line.
        pv.add(mv(Square::A2, Square::A3), 0);
        pv.clear(1);
        assert_eq!(pv.root_line().best_move(), mv(Square::D2, Square::D4));
    }

    #[test]
    fn empty_line_has_null_best_move() {
        let pv = PVariation::new();
        assert!(pv.best_move().is_null());
        assert_eq!(pv.to_string(), "");
    }
}

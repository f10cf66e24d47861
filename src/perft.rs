#![allow(clippy::module_name_repetitions)]

use crate::chess::{chessmove::Move, movegen::MoveList, position::Position};

/// Counts the legal move paths of length `depth` from `pos`.
pub fn perft(pos: &Position<'_>, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut ml = MoveList::new();
    pos.generate_moves(&mut ml);

    let mut child: Position<'_> = Position::blank();
    let mut count = 0;
    for &m in &ml {
        pos.apply_into(m, &mut child);
        if !child.is_valid() {
            continue;
        }
        count += if depth == 1 { 1 } else { perft(&child, depth - 1) };
    }

    count
}

/// Perft split by root move, in generation order.
pub fn divide(pos: &Position<'_>, depth: usize) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }
    pos.legal_moves()
        .into_iter()
        .map(|m| (m, perft(&pos.apply(m), depth - 1)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(fen: &str, expected: &[u64]) {
        let pos = Position::from_fen(fen).unwrap();
        for (depth, &nodes) in (1..).zip(expected) {
            assert_eq!(perft(&pos, depth), nodes, "perft({depth}) of {fen}");
        }
    }

    #[test]
    fn perft_start_position() {
        check(Position::STARTING_FEN, &[20, 400, 8_902, 197_281, 4_865_609]);
    }

    #[test]
    fn perft_hard_position() {
        check(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            &[48, 2_039, 97_862],
        );
    }

    #[test]
    fn perft_rook_endgame_with_en_passant_pins() {
        check("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", &[14, 191, 2_812, 43_238]);
    }

    #[test]
    fn perft_promotions_and_castling_rights() {
        check("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", &[6, 264, 9_467]);
        check("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", &[44, 1_486, 62_379]);
    }

    #[test]
    fn perft_middlegame() {
        let fen = "r1b2rk1/4nppp/p3p3/2qpP3/8/2N2N2/PP3PPP/2RQ1RK1 b - - 3 14";
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(perft(&pos, 4), 1_162_726);
    }

    #[test]
    fn perft_endgame() {
        let pos = Position::from_fen("5n2/R7/4pk2/8/5PK1/8/8/8 b - - 0 1").unwrap();
        assert_eq!(perft(&pos, 6), 2_024_953);
    }

    #[test]
    fn divide_sums_to_perft() {
        let pos = Position::startpos();
        let split = divide(&pos, 3);
        assert_eq!(split.len(), 20);
        assert_eq!(split.iter().map(|&(_, n)| n).sum::<u64>(), 8_902);
        assert!(split.iter().all(|&(_, n)| n >= 380));
        assert!(divide(&pos, 0).is_empty());
    }
}

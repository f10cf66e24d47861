use std::time::{Duration, Instant};

use crate::{
    chess::position::Position,
    errors::FenParseError,
    evaluation::PieceSquareEvaluator,
    search::{AlphaBeta, SearchAlgorithm},
    timemgmt::{DepthLimit, TimeStrategy},
};

pub const BENCH_FENS: [&str; 8] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r1b2rk1/4nppp/p3p3/2qpP3/8/2N2N2/PP3PPP/2RQ1RK1 b - - 3 14",
    "5n2/R7/4pk2/8/5PK1/8/8/8 b - - 0 1",
    "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
];

#[derive(Clone, Copy, Debug)]
pub struct BenchResult {
    pub nodes: u64,
    pub elapsed: Duration,
}

impl BenchResult {
    pub fn nps(&self) -> u64 {
        #![allow(
            clippy::cast_precision_loss,
            clippy::cast_sign_loss,
            clippy::cast_possible_truncation
        )]
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { (self.nodes as f64 / secs) as u64 } else { 0 }
    }
}

/// Searches every bench position to `depth`, one after another on the calling thread.
pub fn run(depth: usize) -> Result<BenchResult, FenParseError> {
    let search = AlphaBeta::new(PieceSquareEvaluator);
    let start = Instant::now();
    let mut nodes = 0;
    for fen in BENCH_FENS {
        let pos = Position::from_fen(fen)?;
        let strategy = DepthLimit::new(depth);
        strategy.start();
        nodes += search.search(&pos, &strategy, &mut |_| {}).nodes;
    }
    Ok(BenchResult { nodes, elapsed: start.elapsed() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_is_deterministic() {
        let first = run(2).unwrap();
        let second = run(2).unwrap();
        assert!(first.nodes > 0);
        assert_eq!(first.nodes, second.nodes);
    }
}

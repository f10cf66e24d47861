pub mod ordering;
pub mod pv;
pub mod stats;

use std::cmp::Reverse;

use arrayvec::ArrayVec;
use tracing::{debug, trace};

use crate::{
    chess::{
        chessmove::Move,
        movegen::{MAX_POSITION_MOVES, MoveList},
        position::Position,
    },
    evaluation::{Evaluator, INFINITY, MATE_SCORE, is_mate_score, mated_in},
    search::{ordering::OrderingChain, pv::PvTable, stats::Statistics},
    timemgmt::TimeStrategy,
};

/// Deepest iteration the driver will start.
pub const MAX_DEPTH: usize = 64;
/// Deepest ply any line can reach, quiescence included.
pub const MAX_PLY: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    /// Nodes between polls of the time strategy. A power of two.
    pub poll_interval: u64,
    /// Extra plies of captures and promotions searched past the horizon.
    pub quiescence_depth: usize,
    /// Moves searched at full depth before reductions start.
    pub lmr_threshold: usize,
    /// How far the ordering pre-search widens the window on each side.
    pub iid_margin: i32,
    pub max_depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            poll_interval: 1024,
            quiescence_depth: 6,
            lmr_threshold: 5,
            iid_margin: 50,
            max_depth: MAX_DEPTH,
        }
    }
}

/// Something that picks a move.
pub trait SearchAlgorithm: Send + Sync {
    /// Searches `root` until `strategy` says to stop, reporting every completed iteration
    /// to `on_progress`. The returned statistics carry the best line; its first move is
    /// only null when `root` has no legal moves.
    fn search(
        &self,
        root: &Position<'_>,
        strategy: &dyn TimeStrategy,
        on_progress: &mut dyn FnMut(&Statistics),
    ) -> Statistics;
}

/// Iterative-deepening alpha-beta with quiescence search.
pub struct AlphaBeta<E> {
    evaluator: E,
    ordering: OrderingChain,
    config: SearchConfig,
}

impl<E: Evaluator> AlphaBeta<E> {
    pub fn new(evaluator: E) -> Self {
        Self::with_config(evaluator, OrderingChain::default(), SearchConfig::default())
    }

    pub fn with_config(evaluator: E, ordering: OrderingChain, config: SearchConfig) -> Self {
        assert!(
            config.poll_interval.is_power_of_two(),
            "poll interval {} is not a power of two",
            config.poll_interval
        );
        assert!(
            config.max_depth <= MAX_DEPTH,
            "max depth {} exceeds {MAX_DEPTH}",
            config.max_depth
        );
        Self { evaluator, ordering, config }
    }

    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }
}

impl<E: Evaluator> SearchAlgorithm for AlphaBeta<E> {
    fn search(
        &self,
        root: &Position<'_>,
        strategy: &dyn TimeStrategy,
        on_progress: &mut dyn FnMut(&Statistics),
    ) -> Statistics {
        trace!(fen = %root, max_depth = self.config.max_depth, "starting search");
        let mut search = Search {
            evaluator: &self.evaluator,
            ordering: &self.ordering,
            config: &self.config,
            strategy,
            stats: Statistics::new(),
            pv: PvTable::new(),
            prev_best: Move::NULL,
            stopped: false,
        };

        for depth in 1..=self.config.max_depth {
            if depth > 1 && strategy.should_stop(&search.stats) {
                break;
            }
            let score = search.negamax(root, depth, 0, -INFINITY, INFINITY);
            if search.stopped {
                // the unfinished iteration searched the previous best move first, so any
                // line it committed is at least as well founded as the last complete one.
                if !search.pv.root_line().moves().is_empty() {
                    search.stats.pv.clone_from(search.pv.root_line());
                }
                debug!(depth, nodes = search.stats.nodes, "search stopped mid-iteration");
                break;
            }
            search.stats.depth = depth;
            search.stats.pv.clone_from(search.pv.root_line());
            search.stats.pv.score = score;
            search.prev_best = search.stats.best_move();
            debug!(depth, score, nodes = search.stats.nodes, "iteration complete");
            on_progress(&search.stats);

            #[allow(clippy::cast_sign_loss)]
            let plies_to_mate = (MATE_SCORE - score.abs()) as usize;
            if is_mate_score(score) && plies_to_mate <= depth {
                break;
            }
        }

        let mut stats = search.stats;
        if stats.pv.moves.is_empty() {
            let mut moves = root.legal_moves();
            self.ordering.order(root, &mut moves);
            if let Some(&first) = moves.first() {
                stats.pv.moves.push(first);
            }
        }
        stats
    }
}

/// Scratch state for one invocation of [`AlphaBeta::search`].
struct Search<'a, E> {
    evaluator: &'a E,
    ordering: &'a OrderingChain,
    config: &'a SearchConfig,
    strategy: &'a dyn TimeStrategy,
    stats: Statistics,
    pv: PvTable,
    prev_best: Move,
    stopped: bool,
}

impl<E: Evaluator> Search<'_, E> {
    /// Checks for a stop request every `poll_interval` nodes. Counters are only bumped by
    /// callers once this has returned false.
    fn poll(&mut self) -> bool {
        if !self.stopped
            && self.stats.nodes & (self.config.poll_interval - 1) == 0
            && self.strategy.should_stop(&self.stats)
        {
            self.stopped = true;
        }
        self.stopped
    }

    fn evaluate(&mut self, pos: &Position<'_>) -> i32 {
        self.stats.evaluations += 1;
        self.evaluator.evaluate(pos)
    }

    fn negamax(
        &mut self,
        pos: &Position<'_>,
        depth: usize,
        ply: usize,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        if depth == 0 {
            return self.quiescence(pos, self.config.quiescence_depth, ply, alpha, beta);
        }
        if self.poll() {
            return 0;
        }
        self.stats.nodes += 1;
        self.stats.seldepth = self.stats.seldepth.max(ply);
        self.pv.clear(ply);

        // fifty-move exhaustion is not a draw.
        if pos.repetitions() >= 3 {
            self.stats.terminal += 1;
            return 0;
        }
        if ply >= MAX_PLY - 1 {
            return self.evaluate(pos);
        }

        let mut moves = pos.legal_moves();
        if moves.is_empty() {
            self.stats.terminal += 1;
            return if pos.in_check() { mated_in(ply) } else { 0 };
        }
        self.ordering.order(pos, &mut moves);
        if depth > 1 {
            self.sort_with_iid(pos, &mut moves, depth, ply, alpha, beta);
            if self.stopped {
                return 0;
            }
        }
        if ply == 0
            && let Some(idx) = moves.iter().position(|&m| m == self.prev_best)
        {
            moves[..=idx].rotate_right(1);
        }

        let mut best = -INFINITY;
        let mut raised_alpha = false;
        for (idx, &m) in moves.iter().enumerate() {
            let child = pos.apply(m);
            self.pv.add(m, ply);

            let mut score;
            if idx >= self.config.lmr_threshold && depth > 1 {
                score = -self.negamax(&child, depth - 2, ply + 1, -beta, -alpha);
                if !self.stopped && score > alpha {
                    score = -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha);
                }
            } else {
                score = -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha);
            }
            if self.stopped {
                return 0;
            }

            best = best.max(score);
            if score > alpha {
                alpha = score;
                raised_alpha = true;
                self.pv.commit(ply, score);
            }
            if score >= beta {
                self.stats.internal_cut += 1;
                return score;
            }
        }

        if raised_alpha {
            self.stats.internal_pv += 1;
        } else {
            self.stats.internal_all += 1;
        }
        best
    }

    /// Searches every move two plies shallower with a widened window and re-sorts the moves
    /// by the scores found. Nothing but the order of `moves` is kept.
    fn sort_with_iid(
        &mut self,
        pos: &Position<'_>,
        moves: &mut MoveList,
        depth: usize,
        ply: usize,
        alpha: i32,
        beta: i32,
    ) {
        let lo = alpha.saturating_sub(self.config.iid_margin).max(-INFINITY);
        let hi = beta.saturating_add(self.config.iid_margin).min(INFINITY);
        let mut scored = ArrayVec::<(i32, Move), MAX_POSITION_MOVES>::new();
        for &m in moves.iter() {
            let child = pos.apply(m);
            let score = -self.negamax(&child, depth - 2, ply + 1, -hi, -lo);
            if self.stopped {
                return;
            }
            scored.push((score, m));
        }
        scored.sort_by_key(|&(score, _)| Reverse(score));
        moves.clear();
        moves.extend(scored.into_iter().map(|(_, m)| m));
    }

    fn quiescence(
        &mut self,
        pos: &Position<'_>,
        depth: usize,
        ply: usize,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        if self.poll() {
            return 0;
        }
        self.stats.nodes += 1;
        self.stats.seldepth = self.stats.seldepth.max(ply);
        self.pv.clear(ply);

        if pos.repetitions() >= 3 {
            self.stats.terminal += 1;
            return 0;
        }
        if ply >= MAX_PLY - 1 {
            return self.evaluate(pos);
        }

        let in_check = pos.in_check();
        let mut moves = pos.legal_moves();
        let mut best;
        if in_check {
            if moves.is_empty() {
                self.stats.terminal += 1;
                return mated_in(ply);
            }
            if depth == 0 {
                return self.evaluate(pos);
            }
            // every evasion has to be looked at.
            best = -INFINITY;
        } else {
            let stand_pat = self.evaluate(pos);
            if stand_pat >= beta {
                self.stats.quiescence_cut += 1;
                return stand_pat;
            }
            if depth == 0 {
                return stand_pat;
            }
            alpha = alpha.max(stand_pat);
            best = stand_pat;
            moves.retain(|m| m.is_tactical());
        }
        self.ordering.order(pos, &mut moves);

        let mut raised_alpha = false;
        for &m in &moves {
            let child = pos.apply(m);
            self.pv.add(m, ply);
            let score = -self.quiescence(&child, depth - 1, ply + 1, -beta, -alpha);
            if self.stopped {
                return 0;
            }
            best = best.max(score);
            if score > alpha {
                alpha = score;
                raised_alpha = true;
                self.pv.commit(ply, score);
            }
            if score >= beta {
                self.stats.quiescence_cut += 1;
                return score;
            }
        }

        if raised_alpha {
            self.stats.quiescence_pv += 1;
        } else {
            self.stats.quiescence_all += 1;
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        evaluation::{PieceSquareEvaluator, format_score, mate_in},
        timemgmt::{DepthLimit, Infinite, NodeLimit},
    };

    fn search_to_depth(fen: &str, depth: usize) -> Statistics {
        let pos = Position::from_fen(fen).unwrap();
        let strategy = DepthLimit::new(depth);
        strategy.start();
        AlphaBeta::new(PieceSquareEvaluator).search(&pos, &strategy, &mut |_| {})
    }

    #[test]
    fn finds_mate_in_one() {
        let stats = search_to_depth(
            "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4",
            3,
        );
        assert_eq!(stats.score(), mate_in(1));
        assert_eq!(stats.best_move().to_string(), "h5f7");
    }

    #[test]
    fn finds_mate_in_two() {
        let stats = search_to_depth("7k/8/5K2/8/8/8/8/6R1 w - - 0 1", 5);
        assert_eq!(stats.score(), mate_in(3));
        assert_eq!(stats.pv.moves().len(), 3);
    }

    #[test]
    fn mated_side_sees_the_mate_coming() {
        let stats = search_to_depth("7k/5K2/8/8/8/8/8/6R1 b - - 1 1", 3);
        assert_eq!(stats.score(), -mate_in(2));
        assert_eq!(stats.best_move().to_string(), "h8h7");
    }

    #[test]
    fn wins_hanging_material() {
        let stats = search_to_depth("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", 2);
        assert_eq!(stats.best_move().to_string(), "d2d5");
        assert!(stats.score() > 300);
    }

    #[test]
    fn stalemate_is_zero() {
        let stats = search_to_depth("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 2);
        assert_eq!(stats.score(), 0);
        assert!(stats.best_move().is_null());
    }

    #[test]
    fn threefold_repetition_is_a_draw_at_the_root() {
        let mut pos = Arc::new(Position::startpos());
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"] {
            let m = pos.parse_uci(uci).unwrap();
            pos = Arc::new(pos.apply_shared(m));
        }
        assert_eq!(pos.repetitions(), 3);
        let strategy = DepthLimit::new(3);
        strategy.start();
        let stats = AlphaBeta::new(PieceSquareEvaluator).search(&pos, &strategy, &mut |_| {});
        assert_eq!(stats.score(), 0);
        // still reports something playable.
        assert!(pos.is_legal(stats.best_move()));
    }

    #[test]
    fn progress_is_reported_per_iteration() {
        let pos = Position::startpos();
        let strategy = DepthLimit::new(3);
        strategy.start();
        let mut depths = Vec::new();
        let stats = AlphaBeta::new(PieceSquareEvaluator)
            .search(&pos, &strategy, &mut |s| depths.push(s.depth));
        assert_eq!(depths, [1, 2, 3]);
        assert_eq!(stats.depth, 3);
        assert!(stats.nodes > 20);
        assert!(pos.is_legal(stats.best_move()));
        let classified = stats.internal_cut
            + stats.internal_pv
            + stats.internal_all
            + stats.quiescence_cut
            + stats.quiescence_pv
            + stats.quiescence_all
            + stats.terminal;
        assert!(classified > 0 && classified <= stats.nodes);
        assert!(stats.evaluations > 0);
    }

    #[test]
    fn checkmated_root_reports_mate_zero() {
        let stats =
            search_to_depth("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3", 3);
        assert_eq!(stats.score(), mated_in(0));
        assert_eq!(format_score(stats.score()), "mate 0");
        assert!(stats.best_move().is_null());
    }

    #[test]
    fn fifty_move_exhaustion_is_not_a_draw() {
        let stats = search_to_depth("4k3/8/8/8/8/8/8/3QK3 w - - 120 200", 3);
        assert!(stats.score() > 500, "{}", stats.score());
        assert!(!stats.best_move().is_null());
    }

    #[test]
    fn late_move_reductions_change_the_tree_not_the_answer() {
        let fen = "4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1";
        let pos = Position::from_fen(fen).unwrap();
        let run = |config: SearchConfig| {
            let strategy = DepthLimit::new(4);
            strategy.start();
            AlphaBeta::with_config(PieceSquareEvaluator, OrderingChain::default(), config)
                .search(&pos, &strategy, &mut |_| {})
        };
        let reduced = run(SearchConfig::default());
        let full = run(SearchConfig { lmr_threshold: usize::MAX, ..SearchConfig::default() });
        assert_eq!(reduced.best_move().to_string(), "d2d5");
        assert_eq!(full.best_move().to_string(), "d2d5");
        assert_ne!(reduced.nodes, full.nodes);
    }

    #[test]
    fn pre_search_promotes_the_mating_move() {
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
        let pos = Position::from_fen(fen).unwrap();
        let evaluator = PieceSquareEvaluator;
        let ordering = OrderingChain::default();
        let config = SearchConfig::default();
        let strategy = Infinite::new();
        strategy.start();
        let mut search = Search {
            evaluator: &evaluator,
            ordering: &ordering,
            config: &config,
            strategy: &strategy,
            stats: Statistics::new(),
            pv: PvTable::new(),
            prev_best: Move::NULL,
            stopped: false,
        };

        let mut moves = pos.legal_moves();
        ordering.order(&pos, &mut moves);
        assert_eq!(moves[0].to_string(), "c4f7");
        let count = moves.len();

        search.sort_with_iid(&pos, &mut moves, 2, 0, -INFINITY, INFINITY);
        assert!(!search.stopped);
        assert_eq!(moves.len(), count);
        assert_eq!(moves[0].to_string(), "h5f7");
        assert!(moves.iter().all(|&m| pos.is_legal(m)));
    }

    #[test]
    fn a_stop_before_any_iteration_still_yields_a_move() {
        let pos = Position::startpos();
        let strategy = Infinite::new();
        strategy.start();
        strategy.force_stop();
        let stats = AlphaBeta::new(PieceSquareEvaluator).search(&pos, &strategy, &mut |_| {});
        assert_eq!(stats.depth, 0);
        assert!(pos.is_legal(stats.best_move()));
    }

    #[test]
    fn node_limits_are_respected_within_one_poll() {
        let pos = Position::startpos();
        let strategy = NodeLimit::new(5_000);
        strategy.start();
        let search = AlphaBeta::new(PieceSquareEvaluator);
        let stats = search.search(&pos, &strategy, &mut |_| {});
        assert!(stats.nodes < 5_000 + search.config().poll_interval, "{}", stats.nodes);
        assert!(pos.is_legal(stats.best_move()));
    }
}

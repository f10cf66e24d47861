use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use crate::{chess::chessmove::Move, evaluation::format_score, search::pv::PVariation};

/// Counters and results for one search. Owned by the search thread and handed out by
/// reference for progress reports.
#[derive(Clone, Debug)]
pub struct Statistics {
    /// Every node visited, main search and quiescence alike.
    pub nodes: u64,
    pub internal_cut: u64,
    pub internal_pv: u64,
    pub internal_all: u64,
    pub quiescence_cut: u64,
    pub quiescence_pv: u64,
    pub quiescence_all: u64,
    /// Nodes scored without search: mates, stalemates and repetitions.
    pub terminal: u64,
    pub evaluations: u64,
    /// The last fully completed iteration.
    pub depth: usize,
    pub seldepth: usize,
    pub pv: PVariation,
    start: Instant,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            nodes: 0,
            internal_cut: 0,
            internal_pv: 0,
            internal_all: 0,
            quiescence_cut: 0,
            quiescence_pv: 0,
            quiescence_all: 0,
            terminal: 0,
            evaluations: 0,
            depth: 0,
            seldepth: 0,
            pv: PVariation::new(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub const fn score(&self) -> i32 {
        self.pv.score()
    }

    pub fn best_move(&self) -> Move {
        self.pv.best_move()
    }

    pub fn nps(&self) -> u64 {
        #![allow(
            clippy::cast_precision_loss,
            clippy::cast_sign_loss,
            clippy::cast_possible_truncation
        )]
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 { (self.nodes as f64 / secs) as u64 } else { 0 }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "info depth {} seldepth {} score {} nodes {} nps {} time {}",
            self.depth,
            self.seldepth,
            format_score(self.score()),
            self.nodes,
            self.nps(),
            self.elapsed().as_millis(),
        )?;
        if !self.pv.moves().is_empty() {
            write!(f, " {}", self.pv)?;
        }
        Ok(())
    }
}

//! Policies deciding when a search has to stop.
//!
//! Every strategy latches: once `should_stop` has answered `true` it keeps doing so until
//! the next `start`. The latch is two flags so that no flag has two writers: `forced` is
//! only written by the thread controlling the search, `tripped` only by the search thread.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crate::search::stats::Statistics;

/// Milliseconds held back from every clock allocation for communication lag.
pub const MOVE_OVERHEAD: u64 = 10;
/// Without a moves-to-go hint, spend this fraction of the remaining clock.
pub const SEARCH_TIME_FRACTION: u64 = 25;

pub trait TimeStrategy: Send + Sync {
    /// Clears the latch. Called before a search begins.
    fn start(&self);
    /// Asks the search to stop at its next poll. Safe to call from any thread.
    fn force_stop(&self);
    /// Polled by the search thread.
    fn should_stop(&self, stats: &Statistics) -> bool;
}

#[derive(Debug, Default)]
struct Latch {
    forced: AtomicBool,
    tripped: AtomicBool,
}

impl Latch {
    fn reset(&self) {
        self.forced.store(false, Ordering::SeqCst);
        self.tripped.store(false, Ordering::SeqCst);
    }

    fn force(&self) {
        self.forced.store(true, Ordering::SeqCst);
    }

    fn check(&self, limit_reached: impl FnOnce() -> bool) -> bool {
        if self.forced.load(Ordering::SeqCst) || self.tripped.load(Ordering::Relaxed) {
            return true;
        }
        let stop = limit_reached();
        if stop {
            self.tripped.store(true, Ordering::Relaxed);
        }
        stop
    }
}

macro_rules! latched_strategy {
    ($name:ident, |$self_:ident, $stats:ident| $limit:expr) => {
        impl TimeStrategy for $name {
            fn start(&self) {
                self.latch.reset();
            }

            fn force_stop(&self) {
                self.latch.force();
            }

            fn should_stop(&$self_, $stats: &Statistics) -> bool {
                $self_.latch.check(|| $limit)
            }
        }
    };
}

/// Runs until told to stop.
#[derive(Debug, Default)]
pub struct Infinite {
    latch: Latch,
}

impl Infinite {
    pub fn new() -> Self {
        Self::default()
    }
}

latched_strategy!(Infinite, |self, _stats| false);

/// Stops once an iteration of the given depth has completed.
#[derive(Debug)]
pub struct DepthLimit {
    depth: usize,
    latch: Latch,
}

impl DepthLimit {
    pub fn new(depth: usize) -> Self {
        Self { depth, latch: Latch::default() }
    }
}

latched_strategy!(DepthLimit, |self, stats| stats.depth >= self.depth);

/// Stops once the given number of nodes has been visited.
#[derive(Debug)]
pub struct NodeLimit {
    nodes: u64,
    latch: Latch,
}

impl NodeLimit {
    pub fn new(nodes: u64) -> Self {
        Self { nodes, latch: Latch::default() }
    }
}

latched_strategy!(NodeLimit, |self, stats| stats.nodes >= self.nodes);

/// Stops after a fixed amount of wall-clock time.
#[derive(Debug)]
pub struct MoveTime {
    budget: Duration,
    latch: Latch,
}

impl MoveTime {
    pub fn new(budget: Duration) -> Self {
        Self { budget, latch: Latch::default() }
    }
}

latched_strategy!(MoveTime, |self, stats| stats.elapsed() >= self.budget);

/// Spends a share of the remaining game clock.
#[derive(Debug)]
pub struct Clock {
    window: Duration,
    latch: Latch,
}

impl Clock {
    pub fn new(remaining: Duration, increment: Duration, moves_to_go: Option<u64>) -> Self {
        Self {
            window: Self::compute_time_window(remaining, increment, moves_to_go),
            latch: Latch::default(),
        }
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    /// The time this move may take. Never more than the clock minus [`MOVE_OVERHEAD`].
    pub fn compute_time_window(
        remaining: Duration,
        increment: Duration,
        moves_to_go: Option<u64>,
    ) -> Duration {
        // u64::MAX milliseconds is far beyond any real clock.
        #![allow(clippy::cast_possible_truncation)]
        let our_clock = remaining.as_millis() as u64;
        let our_inc = increment.as_millis() as u64;
        let max_time = our_clock.saturating_sub(MOVE_OVERHEAD);
        let computed = match moves_to_go {
            Some(moves_to_go) => our_clock / moves_to_go.clamp(2, SEARCH_TIME_FRACTION),
            None => (our_clock / SEARCH_TIME_FRACTION + our_inc / 2).saturating_sub(MOVE_OVERHEAD),
        };
        Duration::from_millis(computed.min(max_time))
    }
}

latched_strategy!(Clock, |self, stats| stats.elapsed() >= self.window);

/// Stops as soon as any of its parts would.
pub struct Composite {
    parts: Vec<Box<dyn TimeStrategy>>,
    latch: Latch,
}

impl Composite {
    pub fn new(parts: Vec<Box<dyn TimeStrategy>>) -> Self {
        Self { parts, latch: Latch::default() }
    }
}

impl TimeStrategy for Composite {
    fn start(&self) {
        self.latch.reset();
        for part in &self.parts {
            part.start();
        }
    }

    fn force_stop(&self) {
        self.latch.force();
        for part in &self.parts {
            part.force_stop();
        }
    }

    fn should_stop(&self, stats: &Statistics) -> bool {
        self.latch.check(|| self.parts.iter().any(|part| part.should_stop(stats)))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn depth_limit_waits_for_completed_iterations() {
        let strategy = DepthLimit::new(4);
        strategy.start();
        let mut stats = Statistics::new();
        stats.depth = 3;
        assert!(!strategy.should_stop(&stats));
        stats.depth = 4;
        assert!(strategy.should_stop(&stats));
    }

    #[test]
    fn stops_are_latched_until_restart() {
        let strategy = NodeLimit::new(100);
        strategy.start();
        let mut stats = Statistics::new();
        stats.nodes = 100;
        assert!(strategy.should_stop(&stats));
        stats.nodes = 0;
        assert!(strategy.should_stop(&stats));
        strategy.start();
        assert!(!strategy.should_stop(&stats));
    }

    #[test]
    fn force_stop_from_another_thread() {
        let strategy = Arc::new(Infinite::new());
        strategy.start();
        let stats = Statistics::new();
        assert!(!strategy.should_stop(&stats));
        let remote = Arc::clone(&strategy);
        thread::spawn(move || remote.force_stop()).join().unwrap();
        assert!(strategy.should_stop(&stats));
    }

    #[test]
    fn zero_move_time_stops_immediately() {
        let strategy = MoveTime::new(Duration::ZERO);
        strategy.start();
        assert!(strategy.should_stop(&Statistics::new()));
        let generous = MoveTime::new(Duration::from_secs(3600));
        generous.start();
        assert!(!generous.should_stop(&Statistics::new()));
    }

    #[test]
    fn composite_stops_when_any_part_does() {
        let strategy =
            Composite::new(vec![Box::new(DepthLimit::new(10)), Box::new(NodeLimit::new(50))]);
        strategy.start();
        let mut stats = Statistics::new();
        stats.nodes = 10;
        assert!(!strategy.should_stop(&stats));
        stats.nodes = 60;
        assert!(strategy.should_stop(&stats));

        let forced = Composite::new(vec![Box::new(Infinite::new())]);
        forced.start();
        forced.force_stop();
        assert!(forced.should_stop(&Statistics::new()));
        forced.start();
        assert!(!forced.should_stop(&Statistics::new()));
    }

    #[test]
    fn clock_windows() {
        let ms = Duration::from_millis;
        // a twenty-fifth of the clock plus half the increment, minus overhead.
        assert_eq!(Clock::compute_time_window(ms(60_000), ms(1_000), None), ms(2_890));
        // moves to go divides the clock directly, clamped to at least two moves.
        assert_eq!(Clock::compute_time_window(ms(60_000), ms(0), Some(10)), ms(6_000));
        assert_eq!(Clock::compute_time_window(ms(60_000), ms(0), Some(1)), ms(30_000));
        // never more than the clock allows.
        assert_eq!(Clock::compute_time_window(ms(5), ms(10_000), None), ms(0));
        assert_eq!(Clock::new(ms(25_000), ms(0), None).window(), ms(990));
    }
}

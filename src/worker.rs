//! Runs searches on a dedicated thread.
//!
//! The caller and the search thread share a single monitor holding one of three states.
//! Only one search is ever in flight: starting a search waits for the previous one to
//! finish, and stopping a search waits until the worker is idle again.

use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use tracing::{debug, error};

use crate::{
    chess::{chessmove::Move, position::Position},
    errors::EngineError,
    search::{SearchAlgorithm, stats::Statistics},
    timemgmt::TimeStrategy,
};

type ProgressCallback = Box<dyn FnMut(&Statistics) + Send>;
type BestMoveCallback = Box<dyn FnOnce(Move, &Statistics) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Waiting,
    Searching,
    Exiting,
}

struct Job {
    algorithm: Arc<dyn SearchAlgorithm>,
    position: Position<'static>,
    strategy: Arc<dyn TimeStrategy>,
    on_progress: ProgressCallback,
    on_best_move: BestMoveCallback,
}

struct Monitor {
    state: WorkerState,
    job: Option<Job>,
    /// The strategy of the search in flight, so that it can be forced to stop.
    active: Option<Arc<dyn TimeStrategy>>,
}

struct Shared {
    monitor: Mutex<Monitor>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Monitor> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_while<'a>(
        &self,
        guard: MutexGuard<'a, Monitor>,
        condition: impl FnMut(&mut Monitor) -> bool,
    ) -> MutexGuard<'a, Monitor> {
        self.changed.wait_while(guard, condition).unwrap_or_else(PoisonError::into_inner)
    }
}

/// Moves the monitor to `Exiting` if the search thread unwinds, so nobody waits forever.
struct PanicGuard<'a>(&'a Shared);

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("search thread panicked, engine is shutting down");
            let mut monitor = self.0.lock();
            monitor.state = WorkerState::Exiting;
            monitor.job = None;
            monitor.active = None;
            self.0.changed.notify_all();
        }
    }
}

fn worker_loop(shared: &Shared) {
    let _guard = PanicGuard(shared);
    loop {
        let mut monitor = shared.wait_while(shared.lock(), |m| m.state == WorkerState::Waiting);
        if monitor.state == WorkerState::Exiting {
            debug!("search thread exiting");
            return;
        }
        let Some(job) = monitor.job.take() else {
            monitor.state = WorkerState::Waiting;
            continue;
        };
        drop(monitor);

        let Job { algorithm, position, strategy, mut on_progress, on_best_move } = job;
        debug!(fen = %position, "search started");
        let stats = algorithm.search(&position, &*strategy, &mut *on_progress);
        debug!(
            nodes = stats.nodes,
            depth = stats.depth,
            best = %stats.best_move(),
            "search finished"
        );
        on_best_move(stats.best_move(), &stats);

        let mut monitor = shared.lock();
        monitor.active = None;
        if monitor.state == WorkerState::Searching {
            monitor.state = WorkerState::Waiting;
        }
        shared.changed.notify_all();
    }
}

/// A handle on the search thread.
pub struct Engine {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new() -> Result<Self, EngineError> {
        let shared = Arc::new(Shared {
            monitor: Mutex::new(Monitor { state: WorkerState::Waiting, job: None, active: None }),
            changed: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("kestrel-search".into())
            .spawn(move || worker_loop(&worker_shared))?;
        Ok(Self { shared, handle: Some(handle) })
    }

    pub fn state(&self) -> WorkerState {
        self.shared.lock().state
    }

    /// Hands a search to the worker, first waiting for any search in flight to finish.
    ///
    /// `strategy` is started here, before the worker can see the job, so a stop request
    /// made as soon as this returns is never lost.
    pub fn start_search(
        &self,
        algorithm: Arc<dyn SearchAlgorithm>,
        position: Position<'static>,
        strategy: Arc<dyn TimeStrategy>,
        on_progress: impl FnMut(&Statistics) + Send + 'static,
        on_best_move: impl FnOnce(Move, &Statistics) + Send + 'static,
    ) -> Result<(), EngineError> {
        let mut monitor =
            self.shared.wait_while(self.shared.lock(), |m| m.state == WorkerState::Searching);
        if monitor.state == WorkerState::Exiting {
            return Err(EngineError::ShutDown);
        }
        strategy.start();
        monitor.active = Some(Arc::clone(&strategy));
        monitor.job = Some(Job {
            algorithm,
            position,
            strategy,
            on_progress: Box::new(on_progress),
            on_best_move: Box::new(on_best_move),
        });
        monitor.state = WorkerState::Searching;
        debug!("search handed to worker");
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Forces the search in flight to stop and waits until the worker is idle. The best
    /// move callback has run by the time this returns.
    pub fn stop_search(&self) {
        let monitor = self.shared.lock();
        if monitor.state != WorkerState::Searching {
            return;
        }
        if let Some(strategy) = &monitor.active {
            strategy.force_stop();
        }
        drop(self.shared.wait_while(monitor, |m| m.state == WorkerState::Searching));
    }

    /// Waits for the search in flight to finish on its own.
    pub fn wait(&self) {
        drop(self.shared.wait_while(self.shared.lock(), |m| m.state == WorkerState::Searching));
    }

    /// Stops any search, then ends the worker thread. Further searches are refused.
    pub fn shutdown(&mut self) {
        self.stop_search();
        {
            let mut monitor = self.shared.lock();
            monitor.state = WorkerState::Exiting;
            self.shared.changed.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("search thread terminated by a panic");
            }
            debug!("engine shut down");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::mpsc,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{
        evaluation::PieceSquareEvaluator,
        search::AlphaBeta,
        timemgmt::{DepthLimit, Infinite},
    };

    fn alpha_beta() -> Arc<dyn SearchAlgorithm> {
        Arc::new(AlphaBeta::new(PieceSquareEvaluator))
    }

    fn start(engine: &Engine, strategy: Arc<dyn TimeStrategy>) -> mpsc::Receiver<Move> {
        let (tx, rx) = mpsc::channel();
        engine
            .start_search(alpha_beta(), Position::startpos(), strategy, |_| {}, move |m, _| {
                tx.send(m).unwrap();
            })
            .unwrap();
        rx
    }

    #[test]
    fn stop_is_prompt_and_engine_is_reusable() {
        let engine = Engine::new().unwrap();
        let rx = start(&engine, Arc::new(Infinite::new()));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(engine.state(), WorkerState::Searching);

        let before = Instant::now();
        engine.stop_search();
        assert!(before.elapsed() < Duration::from_secs(2));
        assert_eq!(engine.state(), WorkerState::Waiting);
        let best = rx.try_recv().unwrap();
        assert!(Position::startpos().is_legal(best));

        let rx = start(&engine, Arc::new(DepthLimit::new(2)));
        engine.wait();
        assert!(Position::startpos().is_legal(rx.try_recv().unwrap()));
    }

    #[test]
    fn force_stop_from_another_thread_ends_the_search() {
        let engine = Engine::new().unwrap();
        let strategy = Arc::new(Infinite::new());
        let rx = start(&engine, strategy.clone());
        let remote = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            strategy.force_stop();
        });
        engine.wait();
        remote.join().unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn immediate_stop_is_not_lost() {
        let engine = Engine::new().unwrap();
        let rx = start(&engine, Arc::new(Infinite::new()));
        engine.stop_search();
        assert!(Position::startpos().is_legal(rx.try_recv().unwrap()));
    }

    #[test]
    fn progress_reaches_the_caller() {
        let engine = Engine::new().unwrap();
        let (tx, rx) = mpsc::channel();
        engine
            .start_search(
                alpha_beta(),
                Position::startpos(),
                Arc::new(DepthLimit::new(3)),
                move |stats| tx.send(stats.depth).unwrap(),
                |_, _| {},
            )
            .unwrap();
        engine.wait();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[test]
    fn shut_down_engines_refuse_work() {
        let mut engine = Engine::new().unwrap();
        engine.shutdown();
        assert_eq!(engine.state(), WorkerState::Exiting);
        let result = engine.start_search(
            alpha_beta(),
            Position::startpos(),
            Arc::new(Infinite::new()),
            |_| {},
            |_, _| {},
        );
        assert!(matches!(result, Err(EngineError::ShutDown)));
    }

    struct Exploding;

    impl SearchAlgorithm for Exploding {
        fn search(
            &self,
            _: &Position<'_>,
            _: &dyn TimeStrategy,
            _: &mut dyn FnMut(&Statistics),
        ) -> Statistics {
            panic!("search blew up");
        }
    }

    #[test]
    fn a_panicking_search_does_not_deadlock() {
        let engine = Engine::new().unwrap();
        engine
            .start_search(
                Arc::new(Exploding),
                Position::startpos(),
                Arc::new(Infinite::new()),
                |_| {},
                |_, _| {},
            )
            .unwrap();
        engine.wait();
        assert_eq!(engine.state(), WorkerState::Exiting);
        engine.stop_search();
    }
}

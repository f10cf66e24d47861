#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Command-line front end for the Kestrel chess engine.

use std::{
    sync::{Arc, mpsc},
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kestrel::{
    bench,
    chess::{attacks, piece::Colour, position::Position},
    cli::{Cli, SearchArgs, Subcommands},
    evaluation::PieceSquareEvaluator,
    perft,
    search::AlphaBeta,
    timemgmt::{Clock, Composite, DepthLimit, MoveTime, NodeLimit, TimeStrategy},
    worker::Engine,
};

/// Depth searched when no limit at all is given.
const DEFAULT_SEARCH_DEPTH: usize = 6;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;
    attacks::init();

    match cli.subcommand {
        Subcommands::Perft { fen, depth, divide } => run_perft(&fen, depth, divide),
        Subcommands::Search(args) => run_search(&args),
        Subcommands::Bench { depth } => {
            let result = bench::run(depth).context("bench position failed to parse")?;
            println!("{} nodes {} nps", result.nodes, result.nps());
            Ok(())
        }
    }
}

fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log filter {level:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}

fn run_perft(fen: &str, depth: usize, divide: bool) -> anyhow::Result<()> {
    #![allow(
        clippy::cast_precision_loss,
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation
    )]
    let pos = Position::from_fen(fen).with_context(|| format!("invalid FEN {fen:?}"))?;
    let start = Instant::now();
    let nodes = if divide {
        let split = perft::divide(&pos, depth);
        for (m, count) in &split {
            println!("{m}: {count}");
        }
        split.iter().map(|&(_, count)| count).sum()
    } else {
        perft::perft(&pos, depth)
    };
    let elapsed = start.elapsed();
    let nps = nodes as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!("nodes {nodes} time {} nps {}", elapsed.as_millis(), nps as u64);
    Ok(())
}

fn strategy_for(args: &SearchArgs, turn: Colour) -> Composite {
    let mut parts: Vec<Box<dyn TimeStrategy>> = Vec::new();
    if let Some(depth) = args.depth {
        parts.push(Box::new(DepthLimit::new(depth)));
    }
    if let Some(nodes) = args.nodes {
        parts.push(Box::new(NodeLimit::new(nodes)));
    }
    if let Some(ms) = args.movetime {
        parts.push(Box::new(MoveTime::new(Duration::from_millis(ms))));
    }
    let (clock, inc) = match turn {
        Colour::White => (args.wtime, args.winc),
        Colour::Black => (args.btime, args.binc),
    };
    if let Some(ms) = clock {
        let (remaining, increment) = (Duration::from_millis(ms), Duration::from_millis(inc));
        parts.push(Box::new(Clock::new(remaining, increment, args.movestogo)));
    }
    if parts.is_empty() {
        parts.push(Box::new(DepthLimit::new(DEFAULT_SEARCH_DEPTH)));
    }
    Composite::new(parts)
}

fn run_search(args: &SearchArgs) -> anyhow::Result<()> {
    let root =
        Position::from_fen(&args.fen).with_context(|| format!("invalid FEN {:?}", args.fen))?;
    let mut pos = Arc::new(root);
    for uci in &args.moves {
        let m = pos.parse_uci(uci).with_context(|| format!("cannot play {uci} in {pos}"))?;
        pos = Arc::new(pos.apply_shared(m));
    }

    let engine = Engine::new()?;
    let (tx, rx) = mpsc::channel();
    engine.start_search(
        Arc::new(AlphaBeta::new(PieceSquareEvaluator)),
        (*pos).clone(),
        Arc::new(strategy_for(args, pos.turn())),
        |stats| println!("{stats}"),
        move |best, _| {
            tx.send(best).ok();
        },
    )?;
    engine.wait();

    let best = rx.recv().context("search ended without reporting a move")?;
    match pos.san(best) {
        Some(san) => println!("bestmove {best} ({san})"),
        None => println!("bestmove {best}"),
    }
    Ok(())
}

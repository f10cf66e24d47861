#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc
)]

//! Kestrel, a bitboard chess engine: magic-bitboard move generation, parent-linked
//! positions and an iterative-deepening alpha-beta search on a worker thread.

#[macro_use]
mod macros;

pub mod bench;
pub mod chess;
pub mod cli;
pub mod errors;
pub mod evaluation;
pub mod perft;
pub mod rng;
pub mod search;
pub mod timemgmt;
pub mod worker;

/// The name of the engine.
pub static NAME: &str = "Kestrel";
/// The version of the engine.
pub static VERSION: &str = env!("CARGO_PKG_VERSION");

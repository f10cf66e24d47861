use clap::{Args, Parser, Subcommand};

use crate::chess::position::Position;

#[derive(Parser)]
#[clap(author, version, about)]
pub struct Cli {
    /// Log filter, e.g. `debug` or `kestrel::worker=trace`. Overrides `RUST_LOG`.
    #[clap(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,
    #[clap(subcommand)]
    pub subcommand: Subcommands,
}

#[derive(Subcommand)]
pub enum Subcommands {
    /// Count the leaf nodes of the legal move tree.
    Perft {
        /// Position to count from.
        #[clap(long, default_value = Position::STARTING_FEN)]
        fen: String,
        #[clap(long, default_value = "5")]
        depth: usize,
        /// Print the count below each root move.
        #[clap(long)]
        divide: bool,
    },
    /// Search a position and print the best move.
    Search(SearchArgs),
    /// Search a fixed set of positions and report the node rate.
    Bench {
        #[clap(long, default_value = "6")]
        depth: usize,
    },
}

#[derive(Args)]
pub struct SearchArgs {
    #[clap(long, default_value = Position::STARTING_FEN)]
    pub fen: String,
    /// Moves to play from the position first, in coordinate notation.
    #[clap(long, num_args = 1.., value_name = "MOVE")]
    pub moves: Vec<String>,
    #[clap(long)]
    pub depth: Option<usize>,
    #[clap(long)]
    pub nodes: Option<u64>,
    /// Fixed thinking time in milliseconds.
    #[clap(long, value_name = "MS")]
    pub movetime: Option<u64>,
    #[clap(long, value_name = "MS")]
    pub wtime: Option<u64>,
    #[clap(long, value_name = "MS")]
    pub btime: Option<u64>,
    #[clap(long, value_name = "MS", default_value = "0")]
    pub winc: u64,
    #[clap(long, value_name = "MS", default_value = "0")]
    pub binc: u64,
    #[clap(long)]
    pub movestogo: Option<u64>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_arguments_parse() {
        let cli = Cli::parse_from([
            "kestrel",
            "--log-level",
            "debug",
            "search",
            "--moves",
            "e2e4",
            "e7e5",
            "--depth",
            "4",
            "--wtime",
            "1000",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Subcommands::Search(args) = cli.subcommand else { panic!("expected search") };
        assert_eq!(args.moves, ["e2e4", "e7e5"]);
        assert_eq!(args.depth, Some(4));
        assert_eq!(args.wtime, Some(1000));
        assert_eq!(args.fen, Position::STARTING_FEN);
    }
}

use thiserror::Error;

use crate::chess::{piece::Colour, types::Rank};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("invalid move length {0}")]
    InvalidLength(usize),
    #[error("invalid from-square file {0}")]
    InvalidFromSquareFile(char),
    #[error("invalid from-square rank {0}")]
    InvalidFromSquareRank(char),
    #[error("invalid to-square file {0}")]
    InvalidToSquareFile(char),
    #[error("invalid to-square rank {0}")]
    InvalidToSquareRank(char),
    #[error("invalid promotion piece {0}")]
    InvalidPromotionPiece(char),
    #[error("illegal move {0}")]
    IllegalMove(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanError {
    #[error("\"{0}\" is not valid algebraic notation")]
    InvalidSan(String),
    #[error("no legal move matches \"{0}\"")]
    IllegalMove(String),
    #[error("\"{0}\" matches more than one legal move")]
    AmbiguousMove(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenParseError {
    #[error("FEN is missing the board field")]
    MissingBoard,
    #[error("FEN is missing the side-to-move field")]
    MissingSide,
    #[error("FEN is missing the castling field")]
    MissingCastling,
    #[error("FEN is missing the en passant field")]
    MissingEnPassant,
    #[error("FEN is missing the halfmove clock")]
    MissingHalfmoveClock,
    #[error("FEN is missing the fullmove number")]
    MissingFullmoveNumber,
    #[error("unexpected tokens after the fullmove number")]
    ExtraTokens,
    #[error("expected 8 board segments, found {0}")]
    BoardSegments(usize),
    #[error("a board segment does not describe exactly 8 squares")]
    BadSquaresInSegment,
    #[error("adjacent digits in a board segment")]
    AdjacentDigits,
    #[error("unexpected character '{0}' in board")]
    UnexpectedCharacter(char),
    #[error("pawns on the first or eighth rank")]
    PawnsOnBackranks,
    #[error("{colour} has no king")]
    MissingKing { colour: Colour },
    #[error("{colour} has more than one king")]
    DuplicateKings { colour: Colour },
    #[error("the side not to move is in check")]
    WaitingInCheck,
    #[error("invalid side to move \"{0}\"")]
    InvalidSide(String),
    #[error("invalid castling field \"{0}\"")]
    InvalidCastling(String),
    #[error("castling right '{right}' needs a {colour} king and rook on their home squares")]
    CastlingPiecesMissing { right: char, colour: Colour },
    #[error("invalid en passant square \"{0}\"")]
    InvalidEnPassant(String),
    #[error("en passant square {square} is on rank {got:?}, expected {expected:?}")]
    InvalidEnPassantRank {
        square: String,
        expected: Rank,
        got: Rank,
    },
    #[error("invalid halfmove clock \"{0}\"")]
    InvalidHalfmoveClock(String),
    #[error("invalid fullmove number \"{0}\"")]
    InvalidFullmoveNumber(String),
    #[error("fullmove number must be at least 1")]
    FullmoveNumberZero,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("the search thread has shut down")]
    ShutDown,
    #[error("failed to spawn the search thread")]
    Spawn(#[from] std::io::Error),
}

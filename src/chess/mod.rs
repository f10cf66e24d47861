pub mod attacks;
pub mod chessmove;
pub mod fen;
pub mod magic;
pub mod movegen;
pub mod notation;
pub mod piece;
pub mod piecelayout;
pub mod position;
pub mod squareset;
pub mod types;
pub mod zobrist;

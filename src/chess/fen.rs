use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU16,
    str::SplitWhitespace,
};

use arrayvec::ArrayVec;

use crate::{
    chess::{
        piece::{Colour, Piece, PieceType},
        piecelayout::PieceLayout,
        squareset::SquareSet,
        types::{CastlingRights, File, Rank, Square},
    },
    errors::FenParseError,
};

/// A parsed FEN representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub board: PieceLayout,
    pub turn: Colour,
    pub castling: CastlingRights,
    pub ep: Option<Square>,
    pub halfmove: u16,
    pub fullmove: NonZeroU16,
}

impl Fen {
    const DEFAULT_FULL_MOVE: NonZeroU16 = NonZeroU16::MIN;

    /// Parse a FEN string in strict mode.
    /// All 6 fields must be present, and no extra tokens are allowed.
    pub fn parse(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();
        let result = Self::parse_inner(&mut tokens, true)?;
        if tokens.next().is_some() {
            return Err(FenParseError::ExtraTokens);
        }
        Ok(result)
    }

    /// Parse a FEN string in relaxed mode.
    /// Missing fields after the board are defaulted to: w, -, -, 0, 1
    /// Extra tokens after the fullmove counter are permitted but ignored.
    pub fn parse_relaxed(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();
        Self::parse_inner(&mut tokens, false)
    }

    /// The fullmove number of the position `ply` half-moves into the game.
    pub fn fullmove_from_ply(ply: u32) -> NonZeroU16 {
        u16::try_from(ply / 2 + 1)
            .ok()
            .and_then(NonZeroU16::new)
            .unwrap_or(NonZeroU16::MAX)
    }

    fn parse_inner(tokens: &mut SplitWhitespace<'_>, strict: bool) -> Result<Self, FenParseError> {
        // Field #1: Piece placement
        let board_str = tokens.next().ok_or(FenParseError::MissingBoard)?;
        let board = Self::parse_board(board_str)?;

        // Field #2: Active colour
        let turn = match tokens.next() {
            Some(s) if strict => Self::parse_turn(s)?,
            Some(s) => Self::parse_turn(s).unwrap_or(Colour::White),
            None if strict => return Err(FenParseError::MissingSide),
            None => Colour::White,
        };

        // the side that just moved cannot have left its king en prise.
        if board
            .king_sq(!turn)
            .is_some_and(|king| board.sq_attacked(king, turn))
        {
            return Err(FenParseError::WaitingInCheck);
        }

        // Field #3: Castling availability
        let castling = match tokens.next() {
            Some(s) if strict => Self::parse_castling(s, &board)?,
            Some(s) => Self::parse_castling(s, &board).unwrap_or(CastlingRights::NONE),
            None if strict => return Err(FenParseError::MissingCastling),
            None => CastlingRights::NONE,
        };

        // Field #4: En passant target square
        let ep = match tokens.next() {
            Some(s) if strict => Self::parse_ep(s, turn)?,
            Some(s) => Self::parse_ep(s, turn).unwrap_or(None),
            None if strict => return Err(FenParseError::MissingEnPassant),
            None => None,
        };

        // Field #5: Halfmove clock
        let halfmove = match tokens.next() {
            Some(s) if strict => Self::parse_halfmove(s)?,
            Some(s) => Self::parse_halfmove(s).unwrap_or(0),
            None if strict => return Err(FenParseError::MissingHalfmoveClock),
            None => 0,
        };

        // Field #6: Fullmove number
        let fullmove = match tokens.next() {
            Some(s) if strict => Self::parse_fullmove(s)?,
            Some(s) => Self::parse_fullmove(s).unwrap_or(Self::DEFAULT_FULL_MOVE),
            None if strict => return Err(FenParseError::MissingFullmoveNumber),
            None => Self::DEFAULT_FULL_MOVE,
        };

        Ok(Self {
            board,
            turn,
            castling,
            ep,
            halfmove,
            fullmove,
        })
    }

    fn parse_board(board_str: &str) -> Result<PieceLayout, FenParseError> {
        let mut layout = PieceLayout::default();

        let mut ranks = ArrayVec::<&str, 8>::new();

        let mut board_parts = board_str.split('/');

        while let Some(rank) = board_parts.next() {
            if ranks.try_push(rank).is_err() {
                // 8 successfully parse, plus one now, plus the rest.
                return Err(FenParseError::BoardSegments(8 + 1 + board_parts.count()));
            }
        }

        if ranks.len() != 8 {
            return Err(FenParseError::BoardSegments(ranks.len()));
        }

        // segments run from the eighth rank down to the first.
        for (rank, rank_str) in Rank::all().rev().zip(&ranks) {
            let mut squares_in_rank = 0u8;
            let mut prev_was_digit = false;

            for c in rank_str.chars() {
                match c {
                    '1'..='8' => {
                        if prev_was_digit {
                            return Err(FenParseError::AdjacentDigits);
                        }
                        prev_was_digit = true;
                        squares_in_rank += c as u8 - b'0';
                        if squares_in_rank > 8 {
                            return Err(FenParseError::BadSquaresInSegment);
                        }
                    }
                    _ => {
                        let piece =
                            Piece::from_char(c).ok_or(FenParseError::UnexpectedCharacter(c))?;
                        prev_was_digit = false;
                        let file = File::from_index(squares_in_rank)
                            .ok_or(FenParseError::BadSquaresInSegment)?;
                        layout.add(Square::from_rank_file(rank, file), piece);
                        squares_in_rank += 1;
                    }
                }
            }

            if squares_in_rank != 8 {
                return Err(FenParseError::BadSquaresInSegment);
            }
        }

        if (layout.of_type(PieceType::Pawn) & SquareSet::BACK_RANKS).non_empty() {
            return Err(FenParseError::PawnsOnBackranks);
        }

        for colour in Colour::all() {
            match layout.piece_bb(Piece::new(colour, PieceType::King)).count() {
                0 => return Err(FenParseError::MissingKing { colour }),
                2.. => return Err(FenParseError::DuplicateKings { colour }),
                1 => (),
            }
        }

        Ok(layout)
    }

    fn parse_turn(s: &str) -> Result<Colour, FenParseError> {
        match s {
            "w" => Ok(Colour::White),
            "b" => Ok(Colour::Black),
            _ => Err(FenParseError::InvalidSide(s.to_string())),
        }
    }

    /// Standard `KQkq` castling. Every right needs its king and rook on their home squares.
    fn parse_castling(s: &str, board: &PieceLayout) -> Result<CastlingRights, FenParseError> {
        if s == "-" {
            return Ok(CastlingRights::NONE);
        }

        let mut rights = CastlingRights::NONE;
        for c in s.chars() {
            let (flag, colour, rook_sq) = match c {
                'K' => (CastlingRights::WK, Colour::White, Square::H1),
                'Q' => (CastlingRights::WQ, Colour::White, Square::A1),
                'k' => (CastlingRights::BK, Colour::Black, Square::H8),
                'q' => (CastlingRights::BQ, Colour::Black, Square::A8),
                _ => return Err(FenParseError::InvalidCastling(s.to_string())),
            };
            if rights.bits() & flag != 0 {
                return Err(FenParseError::InvalidCastling(s.to_string()));
            }
            let king_sq = Square::E1.relative_to(colour);
            if board.piece_at(king_sq) != Some(Piece::new(colour, PieceType::King))
                || board.piece_at(rook_sq) != Some(Piece::new(colour, PieceType::Rook))
            {
                return Err(FenParseError::CastlingPiecesMissing { right: c, colour });
            }
            rights = rights.with(flag);
        }

        Ok(rights)
    }

    fn parse_ep(s: &str, turn: Colour) -> Result<Option<Square>, FenParseError> {
        if s == "-" {
            return Ok(None);
        }

        let &[file_char, rank_char] = s.as_bytes() else {
            return Err(FenParseError::InvalidEnPassant(s.to_string()));
        };

        let file = file_char
            .checked_sub(b'a')
            .and_then(File::from_index)
            .ok_or_else(|| FenParseError::InvalidEnPassant(s.to_string()))?;
        let rank = rank_char
            .checked_sub(b'1')
            .and_then(Rank::from_index)
            .ok_or_else(|| FenParseError::InvalidEnPassant(s.to_string()))?;

        // the square passed over by a double push from the side not to move.
        let expected_rank = match turn {
            Colour::White => Rank::Six,
            Colour::Black => Rank::Three,
        };

        if rank != expected_rank {
            return Err(FenParseError::InvalidEnPassantRank {
                square: s.to_string(),
                expected: expected_rank,
                got: rank,
            });
        }

        Ok(Some(Square::from_rank_file(rank, file)))
    }

    fn parse_halfmove(s: &str) -> Result<u16, FenParseError> {
        s.parse()
            .map_err(|_| FenParseError::InvalidHalfmoveClock(s.to_string()))
    }

    fn parse_fullmove(s: &str) -> Result<NonZeroU16, FenParseError> {
        let value: u16 = s
            .parse()
            .map_err(|_| FenParseError::InvalidFullmoveNumber(s.to_string()))?;

        NonZeroU16::new(value).ok_or(FenParseError::FullmoveNumberZero)
    }
}

impl Display for Fen {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for rank in Rank::all().rev() {
            let mut empty = 0;
            for file in File::all() {
                match self.board.piece_at(Square::from_rank_file(rank, file)) {
                    Some(piece) => {
                        if empty != 0 {
                            write!(f, "{empty}")?;
                            empty = 0;
                        }
                        write!(f, "{piece}")?;
                    }
                    None => empty += 1,
                }
            }
            if empty != 0 {
                write!(f, "{empty}")?;
            }
            if rank != Rank::One {
                write!(f, "/")?;
            }
        }
        let turn = match self.turn {
            Colour::White => 'w',
            Colour::Black => 'b',
        };
        write!(f, " {turn} {} ", self.castling)?;
        match self.ep {
            Some(sq) => write!(f, "{sq}")?,
            None => write!(f, "-")?,
        }
        write!(f, " {} {}", self.halfmove, self.fullmove)
    }
}

//! Coordinate and algebraic move notation.

use crate::{
    chess::{
        chessmove::Move,
        piece::{Piece, PieceType},
        position::Position,
        types::{File, Rank, Square},
    },
    errors::{MoveParseError, SanError},
};

impl Position<'_> {
    /// Resolves a coordinate-notation move (`e2e4`, `e7e8q`) against the legal moves here.
    pub fn parse_uci(&self, uci: &str) -> Result<Move, MoveParseError> {
        use MoveParseError::{
            IllegalMove, InvalidFromSquareFile, InvalidFromSquareRank, InvalidLength,
            InvalidPromotionPiece, InvalidToSquareFile, InvalidToSquareRank,
        };
        let bytes = uci.as_bytes();
        if !(4..=5).contains(&bytes.len()) {
            return Err(InvalidLength(bytes.len()));
        }
        let file = |b: u8| b.checked_sub(b'a').and_then(File::from_index);
        let rank = |b: u8| b.checked_sub(b'1').and_then(Rank::from_index);
        let from_file = file(bytes[0]).ok_or(InvalidFromSquareFile(bytes[0] as char))?;
        let from_rank = rank(bytes[1]).ok_or(InvalidFromSquareRank(bytes[1] as char))?;
        let to_file = file(bytes[2]).ok_or(InvalidToSquareFile(bytes[2] as char))?;
        let to_rank = rank(bytes[3]).ok_or(InvalidToSquareRank(bytes[3] as char))?;
        let promotion = match bytes.get(4) {
            None => None,
            Some(b'n') => Some(PieceType::Knight),
            Some(b'b') => Some(PieceType::Bishop),
            Some(b'r') => Some(PieceType::Rook),
            Some(b'q') => Some(PieceType::Queen),
            Some(&other) => return Err(InvalidPromotionPiece(other as char)),
        };

        let from = Square::from_rank_file(from_rank, from_file);
        let to = Square::from_rank_file(to_rank, to_file);

        self.legal_moves()
            .into_iter()
            .find(|m| m.from() == from && m.to() == to && m.promotion_type() == promotion)
            .ok_or_else(|| IllegalMove(uci.to_string()))
    }

    fn moved_type(&self, m: Move) -> Option<PieceType> {
        self.piece_at(m.from()).map(Piece::piece_type)
    }

    /// Renders `m` in standard algebraic notation, or `None` if it is not legal here.
    pub fn san(&self, m: Move) -> Option<String> {
        let legal = self.legal_moves();
        if !legal.contains(&m) {
            return None;
        }
        let mut out = String::new();
        if m.is_castle() {
            out.push_str(if m.to().file() == File::G { "O-O" } else { "O-O-O" });
        } else {
            let piece_type = self.moved_type(m)?;
            let from = m.from();
            if piece_type == PieceType::Pawn {
                if m.is_capture() {
                    out.push(from.file().char());
                }
            } else {
                out.push(piece_type.san_char());
                let rivals = legal
                    .iter()
                    .filter(|r| {
                        r.to() == m.to()
                            && r.from() != from
                            && self.moved_type(**r) == Some(piece_type)
                    })
                    .map(|r| r.from())
                    .collect::<Vec<_>>();
                if !rivals.is_empty() {
                    // file alone, then rank alone, then both.
                    if rivals.iter().all(|r| r.file() != from.file()) {
                        out.push(from.file().char());
                    } else if rivals.iter().all(|r| r.rank() != from.rank()) {
                        out.push(from.rank().char());
                    } else {
                        out.push_str(from.name());
                    }
                }
            }
            if m.is_capture() {
                out.push('x');
            }
            out.push_str(m.to().name());
            if let Some(promo) = m.promotion_type() {
                out.push('=');
                out.push(promo.san_char());
            }
        }

        let child = self.apply(m);
        if child.in_check() {
            out.push(if child.legal_moves().is_empty() { '#' } else { '+' });
        }
        Some(out)
    }

    /// Parses a move in standard algebraic notation.
    ///
    /// Check and mate suffixes, a missing `x`, a missing `=` before the promotion piece and
    /// zeros in castling are all accepted. Over-specified moves are accepted too.
    pub fn parse_san(&self, san: &str) -> Result<Move, SanError> {
        let san = san.trim();
        let invalid = || SanError::InvalidSan(san.to_string());
        let body = san.trim_end_matches(['+', '#', '!', '?']);

        let legal = self.legal_moves();
        let castle_file = match body {
            "O-O" | "0-0" => Some(File::G),
            "O-O-O" | "0-0-0" => Some(File::C),
            _ => None,
        };
        if let Some(file) = castle_file {
            return legal
                .iter()
                .copied()
                .find(|m| m.is_castle() && m.to().file() == file)
                .ok_or_else(|| SanError::IllegalMove(san.to_string()));
        }

        let mut bytes = body.as_bytes();
        let piece_type = match bytes.first() {
            Some(&c @ (b'N' | b'B' | b'R' | b'Q' | b'K')) => {
                bytes = &bytes[1..];
                PieceType::from_san_char(c as char).ok_or_else(invalid)?
            }
            Some(_) => PieceType::Pawn,
            None => return Err(invalid()),
        };

        let promo_piece = |c: u8| match c.to_ascii_uppercase() {
            b'N' => Some(PieceType::Knight),
            b'B' => Some(PieceType::Bishop),
            b'R' => Some(PieceType::Rook),
            b'Q' => Some(PieceType::Queen),
            _ => None,
        };
        let mut promotion = None;
        if let [rest @ .., b'=', p] = bytes {
            promotion = Some(promo_piece(*p).ok_or_else(invalid)?);
            bytes = rest;
        } else if let [rest @ .., b'1' | b'8', p] = bytes {
            if let Some(pt) = promo_piece(*p) {
                promotion = Some(pt);
                bytes = &bytes[..=rest.len()];
            }
        }

        let [middle @ .., to_file, to_rank] = bytes else {
            return Err(invalid());
        };
        let to = Square::from_rank_file(
            to_rank.checked_sub(b'1').and_then(Rank::from_index).ok_or_else(invalid)?,
            to_file.checked_sub(b'a').and_then(File::from_index).ok_or_else(invalid)?,
        );

        let middle = middle.strip_suffix(b"x").unwrap_or(middle);
        let mut from_file = None;
        let mut from_rank = None;
        for &c in middle {
            match c {
                b'a'..=b'h' if from_file.is_none() && from_rank.is_none() => {
                    from_file = File::from_index(c - b'a');
                }
                b'1'..=b'8' if from_rank.is_none() => from_rank = Rank::from_index(c - b'1'),
                _ => return Err(invalid()),
            }
        }

        let mut candidates = legal.iter().copied().filter(|m| {
            !m.is_castle()
                && m.to() == to
                && self.moved_type(*m) == Some(piece_type)
                && m.promotion_type() == promotion
                && from_file.is_none_or(|f| m.from().file() == f)
                && from_rank.is_none_or(|r| m.from().rank() == r)
        });
        match (candidates.next(), candidates.next()) {
            (Some(m), None) => Ok(m),
            (None, _) => Err(SanError::IllegalMove(san.to_string())),
            (Some(_), Some(_)) => Err(SanError::AmbiguousMove(san.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::chessmove::MoveKind;

    const QUEENS: &str = "4k3/8/8/8/8/Q7/8/Q1Q3K1 w - - 0 1";
    const SCHOLAR: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

    fn san_of(fen: &str, uci: &str) -> String {
        let pos = Position::from_fen(fen).unwrap();
        pos.san(pos.parse_uci(uci).unwrap()).unwrap()
    }

    #[test]
    fn uci_errors() {
        let pos = Position::startpos();
        assert_eq!(pos.parse_uci("e2e"), Err(MoveParseError::InvalidLength(3)));
        assert_eq!(pos.parse_uci("i2e4"), Err(MoveParseError::InvalidFromSquareFile('i')));
        assert_eq!(pos.parse_uci("e9e4"), Err(MoveParseError::InvalidFromSquareRank('9')));
        assert_eq!(pos.parse_uci("e2z4"), Err(MoveParseError::InvalidToSquareFile('z')));
        assert_eq!(pos.parse_uci("e2e0"), Err(MoveParseError::InvalidToSquareRank('0')));
        assert_eq!(pos.parse_uci("e7e8k"), Err(MoveParseError::InvalidPromotionPiece('k')));
        assert_eq!(
            pos.parse_uci("e2e5"),
            Err(MoveParseError::IllegalMove("e2e5".into()))
        );
        assert_eq!(pos.parse_uci("e2e4").unwrap().to_string(), "e2e4");
    }

    #[test]
    fn basic_san() {
        assert_eq!(san_of(Position::STARTING_FEN, "e2e4"), "e4");
        assert_eq!(san_of(Position::STARTING_FEN, "g1f3"), "Nf3");
        assert_eq!(san_of(SCHOLAR, "h5f7"), "Qxf7#");
        assert_eq!(san_of("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1c1"), "O-O-O");
        assert_eq!(san_of("4k3/P7/8/8/8/8/8/4K3 w - - 0 1", "a7a8q"), "a8=Q+");
        assert_eq!(san_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), "exd5");
    }

    #[test]
    fn disambiguation_prefers_file_then_rank() {
        assert_eq!(san_of(QUEENS, "c1b2"), "Qcb2");
        assert_eq!(san_of(QUEENS, "a3b2"), "Q3b2");
        assert_eq!(san_of(QUEENS, "a1b2"), "Qa1b2");
        assert_eq!(san_of("4k3/8/8/8/8/8/8/R4RK1 w - - 0 1", "a1d1"), "Rad1");
        assert_eq!(san_of("4k3/8/8/R7/8/8/8/R5K1 w - - 0 1", "a1a3"), "R1a3");
    }

    #[test]
    fn illegal_moves_have_no_san() {
        let pos = Position::startpos();
        let bogus = Move::new(Square::E2, Square::E5, MoveKind::Normal, false);
        assert_eq!(pos.san(bogus), None);
    }

    #[test]
    fn parse_san_variants() {
        let pos = Position::from_fen(SCHOLAR).unwrap();
        let mate = pos.parse_uci("h5f7").unwrap();
        for text in ["Qxf7#", "Qxf7", "Qf7", "Qhf7", "Qh5xf7+"] {
            assert_eq!(pos.parse_san(text), Ok(mate), "{text}");
        }
        let rooks = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let castles = rooks.parse_uci("e1g1").unwrap();
        assert_eq!(rooks.parse_san("O-O"), Ok(castles));
        assert_eq!(rooks.parse_san("0-0+"), Ok(castles));
        assert_eq!(rooks.parse_san("O-O-O"), Ok(rooks.parse_uci("e1c1").unwrap()));

        let promo = Position::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let a8n = promo.parse_uci("a7a8n").unwrap();
        assert_eq!(promo.parse_san("a8=N"), Ok(a8n));
        assert_eq!(promo.parse_san("a8N"), Ok(a8n));
        assert!(matches!(promo.parse_san("a8"), Err(SanError::IllegalMove(_))));
    }

    #[test]
    fn parse_san_failures_are_distinct() {
        let pos = Position::from_fen(QUEENS).unwrap();
        assert_eq!(
            pos.parse_san("Qb2"),
            Err(SanError::AmbiguousMove("Qb2".into()))
        );
        assert_eq!(pos.parse_san("Qa1b2"), Ok(pos.parse_uci("a1b2").unwrap()));
        assert!(matches!(pos.parse_san("Nf3"), Err(SanError::IllegalMove(_))));
        assert!(matches!(pos.parse_san("O-O"), Err(SanError::IllegalMove(_))));
        assert!(matches!(pos.parse_san("zz"), Err(SanError::InvalidSan(_))));
        assert!(matches!(pos.parse_san(""), Err(SanError::InvalidSan(_))));
    }

    #[test]
    fn san_round_trips_over_legal_moves() {
        for fen in [
            Position::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            QUEENS,
        ] {
            let pos = Position::from_fen(fen).unwrap();
            for m in pos.legal_moves() {
                let san = pos.san(m).unwrap();
                assert_eq!(pos.parse_san(&san), Ok(m), "{san} in {fen}");
            }
        }
    }
}

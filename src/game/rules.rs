//! Chess rules on top of the `chess` crate.
//!
//! Everything here is a pure function of its inputs. A [`Position`] carries a
//! link to the position it was reached from, which is all that undo and
//! repetition detection need.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chess::{Board, BoardStatus, ChessMove, Color, File, MoveGen, Piece, Rank, Square};

use crate::error::GameError;
use crate::game::utils::has_insufficient_material;
use crate::models::Side;

/// Complete board state: placement, side to move, castling and en passant
/// rights, move counters.
#[derive(Clone, PartialEq, Eq)]
pub struct Position {
    board: Board,
    halfmove_clock: u32,
    fullmove_number: u32,
    previous: Option<Arc<Position>>,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            board: Board::default(),
            halfmove_clock: 0,
            fullmove_number: 1,
            previous: None,
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Position").field(&self.fen()).finish()
    }
}

impl Position {
    pub fn from_fen(fen: &str) -> Result<Position, GameError> {
        let board =
            Board::from_str(fen).map_err(|_| GameError::InvalidPosition(fen.to_string()))?;
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let halfmove_clock = match fields.get(4) {
            Some(v) => v.parse().map_err(|_| GameError::InvalidPosition(fen.to_string()))?,
            None => 0,
        };
        let fullmove_number = match fields.get(5) {
            Some(v) => v.parse().map_err(|_| GameError::InvalidPosition(fen.to_string()))?,
            None => 1,
        };
        Ok(Position {
            board,
            halfmove_clock,
            fullmove_number,
            previous: None,
        })
    }

    /// Six-field FEN string.
    pub fn fen(&self) -> String {
        // The board's own FEN has placeholder counters, so only its first four
        // fields are kept.
        let board_fen = self.board.to_string();
        let head: Vec<&str> = board_fen.split_whitespace().take(4).collect();
        format!("{} {} {}", head.join(" "), self.halfmove_clock, self.fullmove_number)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Side {
        Side::from_color(self.board.side_to_move())
    }

    /// How many times the current position has occurred since the last
    /// capture or pawn move, this occurrence included.
    pub fn repetitions(&self) -> usize {
        let mut count = 1;
        let mut remaining = self.halfmove_clock;
        let mut cursor = self.previous.as_deref();
        while let Some(earlier) = cursor {
            if remaining == 0 {
                break;
            }
            if earlier.board == self.board {
                count += 1;
            }
            remaining -= 1;
            cursor = earlier.previous.as_deref();
        }
        count
    }
}

/// What the rules engine reports about an applied move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveMeta {
    pub from: Square,
    pub to: Square,
    pub san: String,
    pub capture: bool,
    pub check: bool,
    pub promotion: Option<Piece>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The side to move has been mated.
    Checkmate,
    Draw(DrawReason),
}

pub fn parse_square(s: &str) -> Result<Square, GameError> {
    Square::from_str(&s.trim().to_lowercase()).map_err(|_| GameError::InvalidSquare(s.to_string()))
}

fn last_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    }
}

/// Apply a move given as source and target squares. Pawns reaching the last
/// rank always become queens.
pub fn apply_move(position: &Position, from: Square, to: Square) -> Result<(Position, MoveMeta), GameError> {
    let board = &position.board;
    let illegal = || GameError::InvalidMove {
        from: from.to_string(),
        to: to.to_string(),
    };

    let mover = board.side_to_move();
    let piece = board.piece_on(from).ok_or_else(illegal)?;
    if board.color_on(from) != Some(mover) {
        return Err(illegal());
    }

    let promotion = if piece == Piece::Pawn && to.get_rank() == last_rank(mover) {
        Some(Piece::Queen)
    } else {
        None
    };
    let chess_move = ChessMove::new(from, to, promotion);
    if !MoveGen::new_legal(board).any(|m| m == chess_move) {
        return Err(illegal());
    }

    let capture = is_capture(position, from, to);
    let next = board.make_move_new(chess_move);
    let check = next.checkers().popcnt() > 0;
    let san = san(board, chess_move, piece, capture, &next);

    let halfmove_clock = if piece == Piece::Pawn || capture {
        0
    } else {
        position.halfmove_clock + 1
    };
    let fullmove_number = match mover {
        Color::Black => position.fullmove_number + 1,
        Color::White => position.fullmove_number,
    };

    let next_position = Position {
        board: next,
        halfmove_clock,
        fullmove_number,
        previous: Some(Arc::new(position.clone())),
    };
    let meta = MoveMeta {
        from,
        to,
        san,
        capture,
        check,
        promotion,
    };
    Ok((next_position, meta))
}

/// Whether moving the piece on `from` to `to` takes something.
pub fn is_capture(position: &Position, from: Square, to: Square) -> bool {
    let board = &position.board;
    // A diagonal pawn move onto an empty square is en passant.
    board.piece_on(to).is_some()
        || (board.piece_on(from) == Some(Piece::Pawn) && from.get_file() != to.get_file())
}

/// Engines may write castling as the king taking its own rook (`e1h1`).
/// Map that onto the king's real destination.
pub fn normalize_castling(position: &Position, from: Square, to: Square) -> Square {
    let board = &position.board;
    let own_rook = board.piece_on(to) == Some(Piece::Rook) && board.color_on(to) == board.color_on(from);
    if board.piece_on(from) != Some(Piece::King) || !own_rook {
        return to;
    }
    let file = if to.get_file().to_index() > from.get_file().to_index() {
        File::G
    } else {
        File::C
    };
    Square::make_square(from.get_rank(), file)
}

/// Squares the piece on `square` may legally move to.
pub fn legal_destinations(position: &Position, square: Square) -> Vec<Square> {
    let mut destinations = Vec::new();
    for chess_move in MoveGen::new_legal(&position.board) {
        if chess_move.get_source() == square && !destinations.contains(&chess_move.get_dest()) {
            destinations.push(chess_move.get_dest());
        }
    }
    destinations
}

pub fn outcome(position: &Position) -> Option<Outcome> {
    match position.board.status() {
        BoardStatus::Checkmate => return Some(Outcome::Checkmate),
        BoardStatus::Stalemate => return Some(Outcome::Draw(DrawReason::Stalemate)),
        BoardStatus::Ongoing => {}
    }
    if position.halfmove_clock >= 100 {
        Some(Outcome::Draw(DrawReason::FiftyMoveRule))
    } else if has_insufficient_material(&position.board) {
        Some(Outcome::Draw(DrawReason::InsufficientMaterial))
    } else if position.repetitions() >= 3 {
        Some(Outcome::Draw(DrawReason::ThreefoldRepetition))
    } else {
        None
    }
}

pub fn is_game_over(position: &Position) -> bool {
    outcome(position).is_some()
}

pub fn is_checkmate(position: &Position) -> bool {
    outcome(position) == Some(Outcome::Checkmate)
}

pub fn is_draw(position: &Position) -> bool {
    matches!(outcome(position), Some(Outcome::Draw(_)))
}

pub fn is_check(position: &Position) -> bool {
    position.board.checkers().popcnt() > 0
}

/// The position before the last move, if there was one.
pub fn undo(position: &Position) -> Option<Position> {
    position.previous.as_deref().cloned()
}

fn piece_letter(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "",
        Piece::Knight => "N",
        Piece::Bishop => "B",
        Piece::Rook => "R",
        Piece::Queen => "Q",
        Piece::King => "K",
    }
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

fn san(board: &Board, chess_move: ChessMove, piece: Piece, capture: bool, next: &Board) -> String {
    let from = chess_move.get_source();
    let to = chess_move.get_dest();
    let file_delta = to.get_file().to_index() as i32 - from.get_file().to_index() as i32;

    let mut out = String::new();
    if piece == Piece::King && file_delta.abs() == 2 {
        out.push_str(if file_delta > 0 { "O-O" } else { "O-O-O" });
    } else if piece == Piece::Pawn {
        if capture {
            out.push(file_char(from));
            out.push('x');
        }
        out.push_str(&to.to_string());
        if let Some(promoted) = chess_move.get_promotion() {
            out.push('=');
            out.push_str(piece_letter(promoted));
        }
    } else {
        out.push_str(piece_letter(piece));
        let rivals: Vec<Square> = MoveGen::new_legal(board)
            .filter(|m| m.get_dest() == to && m.get_source() != from)
            .map(|m| m.get_source())
            .filter(|s| board.piece_on(*s) == Some(piece))
            .collect();
        if !rivals.is_empty() {
            let same_file = rivals.iter().any(|s| s.get_file() == from.get_file());
            let same_rank = rivals.iter().any(|s| s.get_rank() == from.get_rank());
            if !same_file {
                out.push(file_char(from));
            } else if !same_rank {
                out.push(rank_char(from));
            } else {
                out.push(file_char(from));
                out.push(rank_char(from));
            }
        }
        if capture {
            out.push('x');
        }
        out.push_str(&to.to_string());
    }

    if next.status() == BoardStatus::Checkmate {
        out.push('#');
    } else if next.checkers().popcnt() > 0 {
        out.push('+');
    }
    out
}

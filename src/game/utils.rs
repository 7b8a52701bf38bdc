use chess::{BitBoard, Board, Color, Piece, EMPTY};

fn pieces_of(board: &Board, color: Color, piece: Piece) -> BitBoard {
    *board.pieces(piece) & *board.color_combined(color)
}

fn is_light_square(square: chess::Square) -> bool {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 1
}

/// Check if neither side has enough material left to deliver checkmate.
///
/// Covers king against king, king and one minor piece against king, and
/// positions where every remaining minor piece is a bishop on the same
/// square colour.
pub fn has_insufficient_material(board: &Board) -> bool {
    let heavy = *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy != EMPTY {
        return false;
    }

    let knights = board.pieces(Piece::Knight).popcnt();
    let bishops = *board.pieces(Piece::Bishop);
    let minors = knights + bishops.popcnt();
    if minors <= 1 {
        return true;
    }
    if knights > 0 {
        return false;
    }

    // Only bishops left: a draw when they all stand on one square colour.
    let white = pieces_of(board, Color::White, Piece::Bishop);
    let black = pieces_of(board, Color::Black, Piece::Bishop);
    let mut colours = (white | black).map(is_light_square);
    match colours.next() {
        Some(first) => colours.all(|c| c == first),
        None => true,
    }
}

//! Remote move suggestions.
//!
//! [`SuggestionService`] is the seam between the game and whatever produces
//! engine moves; [`worker::SuggestionWorker`] runs it off the game's actor and
//! reports back with tagged messages.

pub mod lichess;
pub mod worker;

use futures::future::BoxFuture;
use log::debug;

use crate::error::EngineError;
use crate::models::SuggestedMove;

pub trait SuggestionService: Send + Sync {
    /// Best move for the side to move in `fen`.
    fn best_move<'a>(&'a self, fen: &'a str) -> BoxFuture<'a, Result<SuggestedMove, EngineError>>;
}

/// Split a UCI move such as `e7e5` or `e7e8q` into its squares.
///
/// The promotion piece is dropped; pawns reaching the last rank always
/// become queens.
pub fn split_uci(uci: &str) -> Result<SuggestedMove, EngineError> {
    let valid = uci.len() >= 4 && uci.is_ascii();
    if !valid {
        return Err(EngineError::MalformedMove(uci.to_string()));
    }
    match &uci[4..] {
        "" | "q" => {}
        piece => debug!("Engine asked for promotion to {:?} in {}, promoting to a queen", piece, uci),
    }
    Ok(SuggestedMove {
        from: uci[0..2].to_string(),
        to: uci[2..4].to_string(),
    })
}

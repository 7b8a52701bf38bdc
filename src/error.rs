use thiserror::Error;

use crate::game::events::Sound;
use crate::models::TurnState;

/// Errors raised by the turn orchestrator.
///
/// None of them is fatal: every variant is either recovered in place or shown
/// to the player as a dismissible notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Invalid move: {from} to {to}")]
    InvalidMove { from: String, to: String },

    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Please select a side before starting!")]
    NoSideSelected,

    #[error("No game in progress")]
    NoActiveGame,

    #[error("A game is already in progress")]
    GameInProgress,

    #[error("Action not allowed while {0}")]
    WrongState(TurnState),

    #[error("Engine error: {0}")]
    EngineFailure(String),

    #[error("A suggestion request is already pending")]
    RequestPending,

    #[error("Stale engine response")]
    StaleResponse,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Action was not confirmed")]
    NotConfirmed,

    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}

impl GameError {
    /// Machine-readable code sent to the browser alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidMove { .. } | GameError::InvalidSquare(_) => "invalid-move",
            GameError::NoSideSelected => "no-side-selected",
            GameError::NoActiveGame => "no-active-game",
            GameError::GameInProgress => "game-in-progress",
            GameError::WrongState(_) => "wrong-state",
            GameError::EngineFailure(_) => "engine-failure",
            GameError::RequestPending => "request-pending",
            GameError::StaleResponse => "stale-response",
            GameError::NothingToUndo => "nothing-to-undo",
            GameError::NotConfirmed => "not-confirmed",
            GameError::InvalidPosition(_) => "invalid-position",
        }
    }

    /// Stale responses are dropped without telling the player.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, GameError::StaleResponse)
    }

    pub fn sound(&self) -> Option<Sound> {
        match self {
            GameError::InvalidMove { .. }
            | GameError::InvalidSquare(_)
            | GameError::NoSideSelected
            | GameError::EngineFailure(_) => Some(Sound::Error),
            _ => None,
        }
    }
}

/// Errors from the remote move-suggestion service.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Lichess API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("No best move found")]
    NoBestMove,

    #[error("Malformed engine move: {0}")]
    MalformedMove(String),

    #[error("Engine request timed out after {0} ms")]
    Timeout(u64),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

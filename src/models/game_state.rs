use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chess::Color;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::rules::Position;

/// The colour the human plays. Fixed for the lifetime of a session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn from_color(color: Color) -> Side {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the player picked in the side selector.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SideChoice {
    White,
    Black,
    Random,
}

impl SideChoice {
    /// Resolve the choice to a concrete side. `Random` is a fair coin flip.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> Side {
        match self {
            SideChoice::White => Side::White,
            SideChoice::Black => Side::Black,
            SideChoice::Random => {
                if rng.gen_bool(0.5) {
                    Side::White
                } else {
                    Side::Black
                }
            }
        }
    }
}

impl FromStr for SideChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "white" => Ok(SideChoice::White),
            "black" => Ok(SideChoice::Black),
            "random" => Ok(SideChoice::Random),
            other => Err(format!("Unknown side: {}", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TurnState {
    AwaitingPlayer,
    AwaitingRemote,
    GameOver,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::AwaitingPlayer => f.write_str("awaiting-player"),
            TurnState::AwaitingRemote => f.write_str("awaiting-remote"),
            TurnState::GameOver => f.write_str("game-over"),
        }
    }
}

/// Identifies one game session. A reply tagged with an older id is stale.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One entry of the move log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub san: String,
    pub side: Side,
}

/// One row of the move table: move number, white's move, black's move.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveRow {
    pub number: usize,
    pub white: String,
    pub black: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    Move,
    Capture,
}

/// Target squares of the currently selected piece.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSet(BTreeMap<String, Marker>);

impl HighlightSet {
    pub fn insert(&mut self, square: String, marker: Marker) {
        self.0.insert(square, marker);
    }

    pub fn get(&self, square: &str) -> Option<Marker> {
        self.0.get(square).copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Terminal message waiting for its display delay to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTerminal {
    pub message: String,
    pub sound: Option<crate::game::events::Sound>,
}

/// Everything that belongs to one game, from "start" until reset.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: SessionId,
    pub side: Side,
    pub turn: TurnState,
    pub position: Position,
    pub moves: Vec<MoveRecord>,
    pub highlights: HighlightSet,
    pub terminal_message: Option<String>,
    pub pending_terminal: Option<PendingTerminal>,
    pub request_pending: bool,
}

impl GameSession {
    pub fn new(side: Side) -> Self {
        GameSession {
            id: SessionId::new(),
            side,
            turn: TurnState::AwaitingPlayer,
            position: Position::default(),
            moves: Vec::new(),
            highlights: HighlightSet::default(),
            terminal_message: None,
            pending_terminal: None,
            request_pending: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.turn != TurnState::GameOver
    }

    /// Move log grouped into numbered rows, white first.
    pub fn move_rows(&self) -> Vec<MoveRow> {
        self.moves
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| MoveRow {
                number: i + 1,
                white: pair[0].san.clone(),
                black: pair.get(1).map(|m| m.san.clone()).unwrap_or_default(),
            })
            .collect()
    }
}

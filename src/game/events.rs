use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game::rules::{MoveMeta, Outcome};
use crate::models::messages::WorkerRequest;
use crate::models::{HighlightSet, MoveRecord, SessionId, Side};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sound {
    Move,
    Capture,
    Check,
    Checkmate,
    Draw,
    Defeat,
    Error,
}

impl Sound {
    /// Sounds to play after a move has been applied.
    pub fn for_move(meta: &MoveMeta) -> Vec<Sound> {
        let mut sounds = vec![if meta.capture { Sound::Capture } else { Sound::Move }];
        if meta.check {
            sounds.push(Sound::Check);
        }
        sounds
    }

    pub fn for_outcome(outcome: Outcome) -> Sound {
        match outcome {
            Outcome::Checkmate => Sound::Checkmate,
            Outcome::Draw(_) => Sound::Draw,
        }
    }
}

/// Something the presentation layer should reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    SideSelected(Option<Side>),
    SessionStarted { session: SessionId, side: Side },
    PositionChanged { fen: String },
    MoveLogged(MoveRecord),
    MovesUndone { count: usize },
    Highlights(HighlightSet),
    /// Whether the player may drag pieces.
    TurnChanged { player_to_move: bool },
    GameOver { message: String },
    Sound(Sound),
    SessionReset,
}

/// Work the host must carry out on behalf of the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RequestSuggestion { session: SessionId, request: WorkerRequest },
    /// Call `finalize_terminal(session)` once `after` has elapsed.
    FinalizeTerminal { session: SessionId, after: Duration },
}

/// Result of one state machine step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub events: Vec<GameEvent>,
    pub commands: Vec<Command>,
}

impl Transition {
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn sounds(&self) -> Vec<Sound> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Sound(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn suggestion_request(&self) -> Option<(SessionId, &WorkerRequest)> {
        self.commands.iter().find_map(|c| match c {
            Command::RequestSuggestion { session, request } => Some((*session, request)),
            _ => None,
        })
    }
}

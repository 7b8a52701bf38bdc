use actix::Message;
use serde::{Deserialize, Serialize};

use crate::game::events::Sound;
use crate::models::{HighlightSet, MoveRecord, MoveRow, SessionId, Side, TurnState};

/// Message sent from the browser to the server
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ClientMessage {
    pub message_type: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub square: Option<String>,
    #[serde(default)]
    pub confirmed: Option<bool>,
}

/// Message sent from the server to the browser
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ServerMessage {
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<TurnState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_to_move: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_move: Option<MoveRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves: Option<Vec<MoveRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undone: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<HighlightSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_over: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<Sound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerMessage {
    pub fn new(message_type: &str) -> Self {
        ServerMessage {
            message_type: message_type.to_string(),
            ..Default::default()
        }
    }
}

/// Squares of a move suggested by the engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SuggestedMove {
    pub from: String,
    pub to: String,
}

/// Request handed to the suggestion worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    Position { fen: String },
}

/// Reply produced by the suggestion worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerResponse {
    BestMove {
        #[serde(rename = "move")]
        best: SuggestedMove,
    },
    Error {
        message: String,
    },
}

/// A worker request tagged with the session that issued it.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct PositionRequest {
    pub session: SessionId,
    pub request: WorkerRequest,
}

/// A worker reply tagged with the session it answers.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct WorkerReply {
    pub session: SessionId,
    pub response: WorkerResponse,
}

/// Stops the suggestion worker when its owner goes away.
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub struct Shutdown;

/// Delivered by the actor's timer once the terminal display delay is over.
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "()")]
pub struct FinalizeTerminal(pub SessionId);

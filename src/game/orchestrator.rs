//! Turn orchestration for a game between the player and the remote engine.
//!
//! [`Orchestrator`] owns the game session and is the only thing that mutates
//! it. Each operation runs to completion and returns a [`Transition`]: events
//! for the view and commands (engine requests, delayed terminal messages) for
//! whoever hosts the orchestrator. No I/O happens here.

use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;

use crate::error::GameError;
use crate::game::events::{Command, GameEvent, Sound, Transition};
use crate::game::rules::{self, MoveMeta, Outcome, Position};
use crate::models::{
    GameSession, HighlightSet, Marker, MoveRecord, MoveRow, PendingTerminal, SessionId, Side,
    SideChoice, TurnState, WorkerRequest, WorkerResponse,
};

/// Full view state, sent when a browser (re)connects or asks for it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub side: Option<Side>,
    pub turn: Option<TurnState>,
    pub fen: String,
    pub moves: Vec<MoveRow>,
    pub highlights: HighlightSet,
    pub player_to_move: bool,
    pub terminal_message: Option<String>,
}

pub struct Orchestrator {
    side: Option<Side>,
    session: Option<GameSession>,
    terminal_delay: Duration,
}

impl Orchestrator {
    pub fn new(terminal_delay: Duration) -> Self {
        Orchestrator {
            side: None,
            session: None,
            terminal_delay,
        }
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn turn_state(&self) -> Option<TurnState> {
        self.session.as_ref().map(|s| s.turn)
    }

    pub fn position(&self) -> Option<&Position> {
        self.session.as_ref().map(|s| &s.position)
    }

    pub fn moves(&self) -> &[MoveRecord] {
        self.session.as_ref().map(|s| s.moves.as_slice()).unwrap_or(&[])
    }

    pub fn highlights(&self) -> Option<&HighlightSet> {
        self.session.as_ref().map(|s| &s.highlights)
    }

    pub fn terminal_message(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.terminal_message.as_deref())
    }

    pub fn is_request_pending(&self) -> bool {
        self.session.as_ref().map_or(false, |s| s.request_pending)
    }

    fn session_mut(&mut self) -> Result<&mut GameSession, GameError> {
        self.session.as_mut().ok_or(GameError::NoActiveGame)
    }

    pub fn select_side<R: Rng + ?Sized>(&mut self, choice: SideChoice, rng: &mut R) -> Result<Transition, GameError> {
        if self.session.as_ref().map_or(false, GameSession::is_active) {
            return Err(GameError::GameInProgress);
        }
        let side = choice.resolve(rng);
        info!("Player side selected: {} ({:?})", side, choice);
        self.side = Some(side);

        let mut transition = Transition::default();
        transition.emit(GameEvent::SideSelected(Some(side)));
        Ok(transition)
    }

    /// Begin a new game, replacing any previous session.
    pub fn start(&mut self) -> Result<Transition, GameError> {
        let side = self.side.ok_or(GameError::NoSideSelected)?;
        let mut session = GameSession::new(side);
        info!("Starting session {} with player as {}", session.id, side);

        let mut transition = Transition::default();
        transition.emit(GameEvent::SessionStarted { session: session.id, side });
        transition.emit(GameEvent::PositionChanged { fen: session.position.fen() });
        transition.emit(GameEvent::Highlights(HighlightSet::default()));
        match side {
            Side::White => {
                session.turn = TurnState::AwaitingPlayer;
                transition.emit(GameEvent::TurnChanged { player_to_move: true });
            }
            Side::Black => enter_awaiting_remote(&mut session, &mut transition),
        }
        self.session = Some(session);
        Ok(transition)
    }

    pub fn player_move(&mut self, from: &str, to: &str) -> Result<Transition, GameError> {
        let delay = self.terminal_delay;
        let session = self.session_mut()?;
        if session.turn != TurnState::AwaitingPlayer {
            return Err(GameError::WrongState(session.turn));
        }

        let from_square = rules::parse_square(from)?;
        let to_square = rules::parse_square(to)?;
        let (position, meta) = rules::apply_move(&session.position, from_square, to_square)?;
        debug!("Player played {} in session {}", meta.san, session.id);

        let mut transition = Transition::default();
        let mover = session.side;
        record_move(session, position, &meta, mover, &mut transition);
        match rules::outcome(&session.position) {
            Some(outcome) => conclude(session, outcome, true, delay, &mut transition),
            None => enter_awaiting_remote(session, &mut transition),
        }
        Ok(transition)
    }

    /// Apply a reply from the suggestion worker.
    ///
    /// Replies for another session, or arriving when no request is pending,
    /// are rejected with [`GameError::StaleResponse`] and change nothing.
    pub fn remote_reply(&mut self, session_id: SessionId, response: WorkerResponse) -> Result<Transition, GameError> {
        let delay = self.terminal_delay;
        let session = match self.session.as_mut() {
            Some(s) if s.id == session_id && s.turn == TurnState::AwaitingRemote && s.request_pending => s,
            _ => {
                debug!("Discarding stale engine reply for session {}", session_id);
                return Err(GameError::StaleResponse);
            }
        };
        session.request_pending = false;

        let best = match response {
            WorkerResponse::BestMove { best } => best,
            WorkerResponse::Error { message } => {
                warn!("Engine error in session {}: {}", session.id, message);
                return Err(GameError::EngineFailure(message));
            }
        };

        let rejected = || GameError::EngineFailure(format!("Invalid move received from engine: {}{}", best.from, best.to));
        let from = rules::parse_square(&best.from).map_err(|_| rejected())?;
        let to = rules::parse_square(&best.to).map_err(|_| rejected())?;
        let to = rules::normalize_castling(&session.position, from, to);
        let (position, meta) = rules::apply_move(&session.position, from, to).map_err(|_| {
            warn!("Engine suggested an illegal move {}{} in session {}", best.from, best.to, session.id);
            rejected()
        })?;
        debug!("Engine played {} in session {}", meta.san, session.id);

        let mut transition = Transition::default();
        let mover = session.side.opponent();
        record_move(session, position, &meta, mover, &mut transition);
        match rules::outcome(&session.position) {
            Some(outcome) => conclude(session, outcome, false, delay, &mut transition),
            None => {
                session.turn = TurnState::AwaitingPlayer;
                transition.emit(GameEvent::TurnChanged { player_to_move: true });
            }
        }
        Ok(transition)
    }

    /// Ask the engine again after a failed request.
    pub fn retry_remote(&mut self) -> Result<Transition, GameError> {
        let session = self.session_mut()?;
        if session.turn != TurnState::AwaitingRemote {
            return Err(GameError::WrongState(session.turn));
        }
        if session.request_pending {
            return Err(GameError::RequestPending);
        }
        info!("Retrying engine request for session {}", session.id);
        let mut transition = Transition::default();
        enter_awaiting_remote(session, &mut transition);
        Ok(transition)
    }

    /// Publish the terminal message held back after a game-ending move.
    pub fn finalize_terminal(&mut self, session_id: SessionId) -> Result<Transition, GameError> {
        let session = match self.session.as_mut() {
            Some(s) if s.id == session_id => s,
            _ => return Err(GameError::StaleResponse),
        };
        let pending = session.pending_terminal.take().ok_or(GameError::StaleResponse)?;
        info!("Session {} finished: {}", session.id, pending.message);
        session.terminal_message = Some(pending.message.clone());

        let mut transition = Transition::default();
        transition.emit(GameEvent::GameOver { message: pending.message });
        if let Some(sound) = pending.sound {
            transition.emit(GameEvent::Sound(sound));
        }
        Ok(transition)
    }

    pub fn highlight(&mut self, square: &str) -> Result<Transition, GameError> {
        let session = self.session_mut()?;
        if session.turn != TurnState::AwaitingPlayer {
            return Err(GameError::WrongState(session.turn));
        }
        let selected = rules::parse_square(square)?;

        let mut highlights = HighlightSet::default();
        for target in rules::legal_destinations(&session.position, selected) {
            let marker = if rules::is_capture(&session.position, selected, target) {
                Marker::Capture
            } else {
                Marker::Move
            };
            highlights.insert(target.to_string(), marker);
        }
        session.highlights = highlights.clone();

        let mut transition = Transition::default();
        transition.emit(GameEvent::Highlights(highlights));
        Ok(transition)
    }

    /// Take back the player's last move together with the engine's reply to it.
    pub fn undo(&mut self) -> Result<Transition, GameError> {
        let session = self.session_mut()?;
        if session.turn != TurnState::AwaitingPlayer {
            return Err(GameError::WrongState(session.turn));
        }
        if session.request_pending {
            return Err(GameError::RequestPending);
        }
        let side = session.side;
        let keep = session
            .moves
            .iter()
            .rposition(|m| m.side == side)
            .ok_or(GameError::NothingToUndo)?;
        let count = session.moves.len() - keep;

        let mut position = session.position.clone();
        for _ in 0..count {
            position = rules::undo(&position).ok_or(GameError::NothingToUndo)?;
        }
        session.position = position;
        session.moves.truncate(keep);
        session.highlights.clear();
        info!("Undid {} plies in session {}", count, session.id);

        let mut transition = Transition::default();
        transition.emit(GameEvent::MovesUndone { count });
        transition.emit(GameEvent::PositionChanged { fen: session.position.fen() });
        transition.emit(GameEvent::Highlights(HighlightSet::default()));
        transition.emit(GameEvent::TurnChanged { player_to_move: true });
        Ok(transition)
    }

    pub fn resign(&mut self, confirmed: bool) -> Result<Transition, GameError> {
        self.end_by_player(confirmed, "You resigned.", Sound::Defeat)
    }

    pub fn agree_draw(&mut self, confirmed: bool) -> Result<Transition, GameError> {
        self.end_by_player(confirmed, "Game drawn by agreement.", Sound::Draw)
    }

    fn end_by_player(&mut self, confirmed: bool, message: &str, sound: Sound) -> Result<Transition, GameError> {
        let session = self.session_mut()?;
        if !session.is_active() {
            return Err(GameError::WrongState(session.turn));
        }
        if !confirmed {
            return Err(GameError::NotConfirmed);
        }
        info!("Session {} ended by the player: {}", session.id, message);
        session.turn = TurnState::GameOver;
        session.request_pending = false;
        session.highlights.clear();
        session.terminal_message = Some(message.to_string());

        let mut transition = Transition::default();
        transition.emit(GameEvent::TurnChanged { player_to_move: false });
        transition.emit(GameEvent::GameOver { message: message.to_string() });
        transition.emit(GameEvent::Sound(sound));
        Ok(transition)
    }

    /// Drop the session and the chosen side.
    pub fn reset(&mut self) -> Transition {
        if let Some(session) = self.session.take() {
            info!("Resetting session {}", session.id);
        }
        self.side = None;

        let mut transition = Transition::default();
        transition.emit(GameEvent::SessionReset);
        transition.emit(GameEvent::SideSelected(None));
        transition.emit(GameEvent::PositionChanged { fen: Position::default().fen() });
        transition
    }

    pub fn snapshot(&self) -> Snapshot {
        match &self.session {
            Some(session) => Snapshot {
                side: Some(session.side),
                turn: Some(session.turn),
                fen: session.position.fen(),
                moves: session.move_rows(),
                highlights: session.highlights.clone(),
                player_to_move: session.turn == TurnState::AwaitingPlayer,
                terminal_message: session.terminal_message.clone(),
            },
            None => Snapshot {
                side: self.side,
                turn: None,
                fen: Position::default().fen(),
                moves: Vec::new(),
                highlights: HighlightSet::default(),
                player_to_move: false,
                terminal_message: None,
            },
        }
    }
}

fn record_move(session: &mut GameSession, position: Position, meta: &MoveMeta, mover: Side, transition: &mut Transition) {
    session.position = position;
    let record = MoveRecord {
        san: meta.san.clone(),
        side: mover,
    };
    session.moves.push(record.clone());
    session.highlights.clear();

    transition.emit(GameEvent::PositionChanged { fen: session.position.fen() });
    transition.emit(GameEvent::MoveLogged(record));
    transition.emit(GameEvent::Highlights(HighlightSet::default()));
    for sound in Sound::for_move(meta) {
        transition.emit(GameEvent::Sound(sound));
    }
}

fn enter_awaiting_remote(session: &mut GameSession, transition: &mut Transition) {
    session.turn = TurnState::AwaitingRemote;
    transition.emit(GameEvent::TurnChanged { player_to_move: false });
    if session.request_pending {
        return;
    }
    session.request_pending = true;
    transition.command(Command::RequestSuggestion {
        session: session.id,
        request: WorkerRequest::Position { fen: session.position.fen() },
    });
}

fn conclude(session: &mut GameSession, outcome: Outcome, player_moved: bool, delay: Duration, transition: &mut Transition) {
    session.turn = TurnState::GameOver;
    transition.emit(GameEvent::TurnChanged { player_to_move: false });

    let message = match (outcome, player_moved) {
        (Outcome::Checkmate, true) => "Checkmate! You won!",
        (Outcome::Checkmate, false) => "Checkmate! You lost!",
        (Outcome::Draw(_), _) => "Game drawn!",
    };
    debug!("Session {} reached {:?}", session.id, outcome);
    session.pending_terminal = Some(PendingTerminal {
        message: message.to_string(),
        sound: Some(Sound::for_outcome(outcome)),
    });
    transition.command(Command::FinalizeTerminal {
        session: session.id,
        after: delay,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SuggestedMove;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn started(choice: SideChoice) -> Orchestrator {
        let mut orchestrator = Orchestrator::new(Duration::from_millis(300));
        orchestrator.select_side(choice, &mut StdRng::seed_from_u64(1)).unwrap();
        orchestrator.start().unwrap();
        orchestrator
    }

    fn best(from: &str, to: &str) -> WorkerResponse {
        WorkerResponse::BestMove {
            best: SuggestedMove { from: from.to_string(), to: to.to_string() },
        }
    }

    #[test]
    fn start_requires_a_side() {
        let mut orchestrator = Orchestrator::new(Duration::ZERO);
        assert_eq!(orchestrator.start(), Err(GameError::NoSideSelected));
        assert!(orchestrator.session().is_none());
    }

    #[test]
    fn white_starts_awaiting_player_black_awaiting_remote() {
        let white = started(SideChoice::White);
        assert_eq!(white.turn_state(), Some(TurnState::AwaitingPlayer));
        assert!(!white.is_request_pending());

        let mut black = Orchestrator::new(Duration::ZERO);
        black.select_side(SideChoice::Black, &mut StdRng::seed_from_u64(1)).unwrap();
        let transition = black.start().unwrap();
        assert_eq!(black.turn_state(), Some(TurnState::AwaitingRemote));
        let (session, request) = transition.suggestion_request().unwrap();
        assert_eq!(Some(session), black.session_id());
        assert_eq!(request, &WorkerRequest::Position { fen: Position::default().fen() });
    }

    #[test]
    fn illegal_move_changes_nothing() {
        let mut orchestrator = started(SideChoice::White);
        let before = orchestrator.snapshot();
        let err = orchestrator.player_move("e2", "e5").unwrap_err();
        assert_eq!(err.code(), "invalid-move");
        assert_eq!(err.sound(), Some(Sound::Error));
        assert_eq!(orchestrator.snapshot(), before);
    }

    #[test]
    fn no_player_moves_while_awaiting_remote() {
        let mut orchestrator = started(SideChoice::White);
        orchestrator.player_move("e2", "e4").unwrap();
        assert_eq!(
            orchestrator.player_move("d2", "d4"),
            Err(GameError::WrongState(TurnState::AwaitingRemote))
        );
        assert_eq!(orchestrator.moves().len(), 1);
    }

    #[test]
    fn only_one_request_outstanding() {
        let mut orchestrator = started(SideChoice::White);
        orchestrator.player_move("e2", "e4").unwrap();
        assert_eq!(orchestrator.retry_remote(), Err(GameError::RequestPending));
    }

    #[test]
    fn engine_error_keeps_waiting_and_allows_retry() {
        let mut orchestrator = started(SideChoice::White);
        orchestrator.player_move("e2", "e4").unwrap();
        let id = orchestrator.session_id().unwrap();
        let fen = orchestrator.position().unwrap().fen();

        let err = orchestrator
            .remote_reply(id, WorkerResponse::Error { message: "No best move found".into() })
            .unwrap_err();
        assert_eq!(err, GameError::EngineFailure("No best move found".into()));
        assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingRemote));
        assert_eq!(orchestrator.position().unwrap().fen(), fen);
        assert_eq!(orchestrator.moves().len(), 1);

        let retry = orchestrator.retry_remote().unwrap();
        assert!(retry.suggestion_request().is_some());
        assert!(orchestrator.is_request_pending());
    }

    #[test]
    fn illegal_engine_move_is_an_engine_failure() {
        let mut orchestrator = started(SideChoice::White);
        orchestrator.player_move("e2", "e4").unwrap();
        let id = orchestrator.session_id().unwrap();
        let err = orchestrator.remote_reply(id, best("e7", "e3")).unwrap_err();
        assert_eq!(err.code(), "engine-failure");
        assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingRemote));
        assert_eq!(orchestrator.moves().len(), 1);
    }

    #[test]
    fn reply_without_pending_request_is_stale() {
        let mut orchestrator = started(SideChoice::White);
        let id = orchestrator.session_id().unwrap();
        assert_eq!(orchestrator.remote_reply(id, best("e7", "e5")), Err(GameError::StaleResponse));
    }

    #[test]
    fn highlights_for_selected_piece() {
        let mut orchestrator = started(SideChoice::White);
        orchestrator.highlight("e2").unwrap();
        let highlights = orchestrator.highlights().unwrap();
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights.get("e4"), Some(Marker::Move));
        assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingPlayer));

        orchestrator.player_move("e2", "e4").unwrap();
        assert!(orchestrator.highlights().unwrap().is_empty());
        assert!(matches!(orchestrator.highlight("d7"), Err(GameError::WrongState(_))));
    }

    #[test]
    fn en_passant_target_is_marked_as_a_capture() {
        let mut orchestrator = started(SideChoice::White);
        let id = orchestrator.session_id().unwrap();
        orchestrator.player_move("e2", "e4").unwrap();
        orchestrator.remote_reply(id, best("a7", "a6")).unwrap();
        orchestrator.player_move("e4", "e5").unwrap();
        orchestrator.remote_reply(id, best("d7", "d5")).unwrap();

        orchestrator.highlight("e5").unwrap();
        let highlights = orchestrator.highlights().unwrap();
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights.get("d6"), Some(Marker::Capture));
        assert_eq!(highlights.get("e6"), Some(Marker::Move));
    }

    #[test]
    fn occupied_target_is_marked_as_a_capture() {
        let mut orchestrator = started(SideChoice::White);
        let id = orchestrator.session_id().unwrap();
        orchestrator.player_move("e2", "e4").unwrap();
        orchestrator.remote_reply(id, best("d7", "d5")).unwrap();

        orchestrator.highlight("e4").unwrap();
        let highlights = orchestrator.highlights().unwrap();
        assert_eq!(highlights.get("d5"), Some(Marker::Capture));
        assert_eq!(highlights.get("e5"), Some(Marker::Move));
    }

    #[test]
    fn undo_takes_back_player_and_engine_moves() {
        let mut orchestrator = started(SideChoice::White);
        assert_eq!(orchestrator.undo(), Err(GameError::NothingToUndo));

        let start = orchestrator.position().unwrap().clone();
        orchestrator.player_move("e2", "e4").unwrap();
        assert!(matches!(orchestrator.undo(), Err(GameError::WrongState(TurnState::AwaitingRemote))));

        let id = orchestrator.session_id().unwrap();
        orchestrator.remote_reply(id, best("e7", "e5")).unwrap();
        let transition = orchestrator.undo().unwrap();
        assert!(transition.events.contains(&GameEvent::MovesUndone { count: 2 }));
        assert_eq!(orchestrator.position(), Some(&start));
        assert!(orchestrator.moves().is_empty());
        assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingPlayer));
    }

    #[test]
    fn black_cannot_undo_the_engines_opening_move() {
        let mut orchestrator = started(SideChoice::Black);
        let id = orchestrator.session_id().unwrap();
        orchestrator.remote_reply(id, best("e2", "e4")).unwrap();
        assert_eq!(orchestrator.undo(), Err(GameError::NothingToUndo));
        assert_eq!(orchestrator.moves().len(), 1);
    }

    #[test]
    fn resign_needs_confirmation() {
        let mut orchestrator = started(SideChoice::White);
        assert_eq!(orchestrator.resign(false), Err(GameError::NotConfirmed));
        assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingPlayer));

        let transition = orchestrator.resign(true).unwrap();
        assert_eq!(transition.sounds(), vec![Sound::Defeat]);
        assert_eq!(orchestrator.turn_state(), Some(TurnState::GameOver));
        assert_eq!(orchestrator.terminal_message(), Some("You resigned."));
        assert!(matches!(orchestrator.resign(true), Err(GameError::WrongState(TurnState::GameOver))));
    }

    #[test]
    fn draw_by_agreement_while_engine_is_thinking() {
        let mut orchestrator = started(SideChoice::White);
        orchestrator.player_move("d2", "d4").unwrap();
        let id = orchestrator.session_id().unwrap();
        orchestrator.agree_draw(true).unwrap();
        assert_eq!(orchestrator.terminal_message(), Some("Game drawn by agreement."));
        assert_eq!(orchestrator.remote_reply(id, best("d7", "d5")), Err(GameError::StaleResponse));
        assert_eq!(orchestrator.moves().len(), 1);
    }

    #[test]
    fn side_cannot_change_mid_game() {
        let mut orchestrator = started(SideChoice::White);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            orchestrator.select_side(SideChoice::Black, &mut rng),
            Err(GameError::GameInProgress)
        );
        assert_eq!(orchestrator.side(), Some(Side::White));
    }

    #[test]
    fn reset_clears_everything() {
        let mut orchestrator = started(SideChoice::White);
        orchestrator.player_move("e2", "e4").unwrap();
        let transition = orchestrator.reset();
        assert!(transition.events.contains(&GameEvent::SessionReset));
        assert!(orchestrator.session().is_none());
        assert_eq!(orchestrator.side(), None);
        assert_eq!(orchestrator.start(), Err(GameError::NoSideSelected));
    }
}

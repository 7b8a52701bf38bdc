use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use chess_vs_engine::error::GameError;
use chess_vs_engine::game::events::{Command, GameEvent, Sound, Transition};
use chess_vs_engine::game::rules::Position;
use chess_vs_engine::game::Orchestrator;
use chess_vs_engine::models::{SideChoice, SuggestedMove, TurnState, WorkerRequest, WorkerResponse};

const TERMINAL_DELAY: Duration = Duration::from_millis(300);

fn new_game(choice: SideChoice) -> (Orchestrator, Transition) {
    let mut orchestrator = Orchestrator::new(TERMINAL_DELAY);
    orchestrator.select_side(choice, &mut StdRng::seed_from_u64(11)).unwrap();
    let transition = orchestrator.start().unwrap();
    (orchestrator, transition)
}

fn bestmove(from: &str, to: &str) -> WorkerResponse {
    WorkerResponse::BestMove {
        best: SuggestedMove { from: from.to_string(), to: to.to_string() },
    }
}

fn engine_plays(orchestrator: &mut Orchestrator, from: &str, to: &str) -> Transition {
    let session = orchestrator.session_id().unwrap();
    orchestrator.remote_reply(session, bestmove(from, to)).unwrap()
}

fn sans(orchestrator: &Orchestrator) -> Vec<String> {
    orchestrator.moves().iter().map(|m| m.san.clone()).collect()
}

#[test]
fn player_move_then_engine_reply() {
    let (mut orchestrator, _) = new_game(SideChoice::White);

    let transition = orchestrator.player_move("e2", "e4").unwrap();
    assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingRemote));
    assert_eq!(transition.sounds(), vec![Sound::Move]);

    let fen = orchestrator.position().unwrap().fen();
    let (session, request) = transition.suggestion_request().expect("engine request");
    assert_eq!(Some(session), orchestrator.session_id());
    assert_eq!(request, &WorkerRequest::Position { fen });

    engine_plays(&mut orchestrator, "e7", "e5");
    assert_eq!(sans(&orchestrator), vec!["e4", "e5"]);
    assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingPlayer));
}

#[test]
fn turns_alternate_until_the_game_ends() {
    let (mut orchestrator, _) = new_game(SideChoice::White);
    let exchanges = [(("d2", "d4"), ("d7", "d5")), (("c2", "c4"), ("e7", "e6")), (("b1", "c3"), ("g8", "f6"))];
    for ((pf, pt), (ef, et)) in exchanges {
        assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingPlayer));
        orchestrator.player_move(pf, pt).unwrap();
        assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingRemote));
        engine_plays(&mut orchestrator, ef, et);
    }
    assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingPlayer));
    assert_eq!(sans(&orchestrator), vec!["d4", "d5", "c4", "e6", "Nc3", "Nf6"]);
}

#[test]
fn player_delivers_checkmate() {
    let (mut orchestrator, _) = new_game(SideChoice::White);
    orchestrator.player_move("e2", "e4").unwrap();
    engine_plays(&mut orchestrator, "e7", "e5");
    orchestrator.player_move("f1", "c4").unwrap();
    engine_plays(&mut orchestrator, "b8", "c6");
    orchestrator.player_move("d1", "h5").unwrap();
    engine_plays(&mut orchestrator, "g8", "f6");

    let transition = orchestrator.player_move("h5", "f7").unwrap();
    assert_eq!(orchestrator.turn_state(), Some(TurnState::GameOver));
    assert!(transition.suggestion_request().is_none());
    assert_eq!(transition.sounds(), vec![Sound::Capture, Sound::Check]);
    assert_eq!(sans(&orchestrator).last().map(String::as_str), Some("Qxf7#"));

    // The result is held back until the final move has been shown.
    assert_eq!(orchestrator.terminal_message(), None);
    let session = orchestrator.session_id().unwrap();
    assert!(transition.commands.contains(&Command::FinalizeTerminal { session, after: TERMINAL_DELAY }));

    let finished = orchestrator.finalize_terminal(session).unwrap();
    assert_eq!(orchestrator.terminal_message(), Some("Checkmate! You won!"));
    assert!(finished.events.contains(&GameEvent::GameOver { message: "Checkmate! You won!".into() }));
    assert_eq!(finished.sounds(), vec![Sound::Checkmate]);

    assert!(matches!(orchestrator.player_move("a2", "a3"), Err(GameError::WrongState(TurnState::GameOver))));
    assert!(orchestrator.retry_remote().is_err());
}

#[test]
fn engine_delivers_checkmate() {
    let (mut orchestrator, _) = new_game(SideChoice::White);
    orchestrator.player_move("f2", "f3").unwrap();
    engine_plays(&mut orchestrator, "e7", "e5");
    orchestrator.player_move("g2", "g4").unwrap();
    let transition = engine_plays(&mut orchestrator, "d8", "h4");

    assert_eq!(orchestrator.turn_state(), Some(TurnState::GameOver));
    let session = orchestrator.session_id().unwrap();
    assert!(transition.commands.contains(&Command::FinalizeTerminal { session, after: TERMINAL_DELAY }));
    orchestrator.finalize_terminal(session).unwrap();
    assert_eq!(orchestrator.terminal_message(), Some("Checkmate! You lost!"));
}

#[test]
fn engine_error_leaves_the_game_waiting() {
    let (mut orchestrator, _) = new_game(SideChoice::White);
    orchestrator.player_move("e2", "e4").unwrap();
    let before = orchestrator.snapshot();
    let session = orchestrator.session_id().unwrap();

    let err = orchestrator
        .remote_reply(session, WorkerResponse::Error { message: "No best move found".into() })
        .unwrap_err();
    assert_eq!(err.code(), "engine-failure");
    assert!(err.is_user_visible());
    assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingRemote));
    assert_eq!(orchestrator.snapshot(), before);
}

#[test]
fn reply_after_reset_is_discarded() {
    let (mut orchestrator, _) = new_game(SideChoice::White);
    orchestrator.player_move("e2", "e4").unwrap();
    let old_session = orchestrator.session_id().unwrap();

    orchestrator.reset();
    orchestrator.select_side(SideChoice::White, &mut StdRng::seed_from_u64(5)).unwrap();
    orchestrator.start().unwrap();
    let fresh = orchestrator.snapshot();

    assert_eq!(orchestrator.remote_reply(old_session, bestmove("e7", "e5")), Err(GameError::StaleResponse));
    assert_eq!(orchestrator.snapshot(), fresh);
    assert!(orchestrator.moves().is_empty());
    assert_eq!(orchestrator.position(), Some(&Position::default()));
}

#[test]
fn delayed_result_of_an_old_session_is_dropped() {
    let (mut orchestrator, _) = new_game(SideChoice::White);
    orchestrator.player_move("f2", "f3").unwrap();
    engine_plays(&mut orchestrator, "e7", "e5");
    orchestrator.player_move("g2", "g4").unwrap();
    engine_plays(&mut orchestrator, "d8", "h4");
    let finished_session = orchestrator.session_id().unwrap();

    orchestrator.select_side(SideChoice::Black, &mut StdRng::seed_from_u64(5)).unwrap();
    orchestrator.start().unwrap();
    assert_eq!(orchestrator.finalize_terminal(finished_session), Err(GameError::StaleResponse));
    assert_eq!(orchestrator.terminal_message(), None);
    assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingRemote));
}

#[test]
fn playing_black_waits_for_the_engine_first() {
    let (mut orchestrator, transition) = new_game(SideChoice::Black);
    assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingRemote));
    assert!(transition.events.contains(&GameEvent::TurnChanged { player_to_move: false }));
    assert!(transition.suggestion_request().is_some());
    assert!(orchestrator.highlight("e7").is_err());

    engine_plays(&mut orchestrator, "e2", "e4");
    orchestrator.player_move("c7", "c5").unwrap();
    assert_eq!(sans(&orchestrator), vec!["e4", "c5"]);
    assert_eq!(orchestrator.turn_state(), Some(TurnState::AwaitingRemote));
}

#[test]
fn undo_then_replay_restores_the_position() {
    let (mut orchestrator, _) = new_game(SideChoice::White);
    orchestrator.player_move("g1", "f3").unwrap();
    engine_plays(&mut orchestrator, "d7", "d5");
    let before = orchestrator.position().unwrap().clone();
    let log_before = sans(&orchestrator);

    orchestrator.player_move("e2", "e4").unwrap();
    engine_plays(&mut orchestrator, "d5", "e4");
    let after = orchestrator.position().unwrap().clone();

    orchestrator.undo().unwrap();
    assert_eq!(orchestrator.position(), Some(&before));
    assert_eq!(sans(&orchestrator), log_before);

    orchestrator.player_move("e2", "e4").unwrap();
    engine_plays(&mut orchestrator, "d5", "e4");
    assert_eq!(orchestrator.position(), Some(&after));
}

#[test]
fn side_selection_is_required_and_sticky() {
    let mut orchestrator = Orchestrator::new(TERMINAL_DELAY);
    assert_eq!(orchestrator.start(), Err(GameError::NoSideSelected));
    assert_eq!(GameError::NoSideSelected.code(), "no-side-selected");

    let mut rng = StdRng::seed_from_u64(99);
    orchestrator.select_side(SideChoice::Random, &mut rng).unwrap();
    let side = orchestrator.side().expect("random resolves to a side");
    orchestrator.start().unwrap();
    assert_eq!(orchestrator.session().unwrap().side, side);
}

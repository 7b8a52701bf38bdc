use actix::AsyncContext;
use actix_web_actors::ws;
use log::{debug, info, warn};

use crate::error::GameError;
use crate::game::events::{Command, GameEvent, Transition};
use crate::game::Snapshot;
use crate::models::{ClientMessage, FinalizeTerminal, PositionRequest, ServerMessage, SideChoice};
use crate::websocket::handler::GameSocket;

impl GameSocket {
    pub fn handle_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        info!("Client {} sent {}", self.id, msg.message_type);
        let message_type = msg.message_type.clone();
        match message_type.as_str() {
            "select_side" => self.handle_select_side(msg, ctx),
            "start" => {
                let result = self.orchestrator.start();
                self.apply(result, ctx);
            }
            "move" => self.handle_move(msg, ctx),
            "highlight" => self.handle_highlight(msg, ctx),
            "undo" => {
                let result = self.orchestrator.undo();
                self.apply(result, ctx);
            }
            "resign" => {
                let result = self.orchestrator.resign(msg.confirmed.unwrap_or(false));
                self.apply(result, ctx);
            }
            "draw" => {
                let result = self.orchestrator.agree_draw(msg.confirmed.unwrap_or(false));
                self.apply(result, ctx);
            }
            "reset" => {
                let transition = self.orchestrator.reset();
                self.dispatch(transition, ctx);
            }
            "retry" => {
                let result = self.orchestrator.retry_remote();
                self.apply(result, ctx);
            }
            "state" => self.send_state(ctx),
            _ => {
                warn!("Unknown message type: {}", message_type);
                self.send_error("unknown-message", &format!("Unknown message type: {}", message_type), ctx);
            }
        }
    }

    fn handle_select_side(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let choice = match msg.side.as_deref().map(str::parse::<SideChoice>) {
            Some(Ok(choice)) => choice,
            Some(Err(e)) => {
                warn!("{}", e);
                self.send_error("invalid-side", &e, ctx);
                return;
            }
            None => {
                self.send_error("invalid-side", "Side selection requires a side", ctx);
                return;
            }
        };
        let result = self.orchestrator.select_side(choice, &mut rand::thread_rng());
        self.apply(result, ctx);
    }

    fn handle_move(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match (msg.from.as_deref(), msg.to.as_deref()) {
            (Some(from), Some(to)) => {
                let result = self.orchestrator.player_move(from, to);
                self.apply(result, ctx);
            }
            _ => {
                warn!("Move action missing from or to");
                self.send_error("invalid-move", "Move requires from and to squares", ctx);
            }
        }
    }

    fn handle_highlight(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg.square.as_deref() {
            Some(square) => {
                let result = self.orchestrator.highlight(square);
                self.apply(result, ctx);
            }
            None => self.send_error("invalid-square", "Highlight requires a square", ctx),
        }
    }

    pub fn apply(&mut self, result: Result<Transition, GameError>, ctx: &mut ws::WebsocketContext<Self>) {
        match result {
            Ok(transition) => self.dispatch(transition, ctx),
            Err(e) => self.report(e, ctx),
        }
    }

    /// Forward events to the browser and carry out the commands.
    pub fn dispatch(&mut self, transition: Transition, ctx: &mut ws::WebsocketContext<Self>) {
        for event in &transition.events {
            self.send(&event_message(event), ctx);
        }
        for command in transition.commands {
            match command {
                Command::RequestSuggestion { session, request } => match &self.worker {
                    Some(worker) => worker.do_send(PositionRequest { session, request }),
                    None => warn!("No suggestion worker for connection {}", self.id),
                },
                Command::FinalizeTerminal { session, after } => {
                    ctx.notify_later(FinalizeTerminal(session), after);
                }
            }
        }
    }

    fn report(&self, error: GameError, ctx: &mut ws::WebsocketContext<Self>) {
        if !error.is_user_visible() {
            debug!("Ignoring {} on connection {}", error, self.id);
            return;
        }
        warn!("Connection {}: {}", self.id, error);
        let mut message = ServerMessage::new("error");
        message.code = Some(error.code().to_string());
        message.error = Some(error.to_string());
        message.sound = error.sound();
        self.send(&message, ctx);
    }

    pub fn send_error(&self, code: &str, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let mut message = ServerMessage::new("error");
        message.code = Some(code.to_string());
        message.error = Some(text.to_string());
        self.send(&message, ctx);
    }

    pub fn send_state(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let message = snapshot_message(&self.orchestrator.snapshot());
        self.send(&message, ctx);
    }

    fn send(&self, message: &ServerMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(message) {
            Ok(text) => ctx.text(text),
            Err(e) => {
                warn!("Failed to serialize {}: {}", message.message_type, e);
                ctx.text("{\"message_type\": \"error\", \"error\": \"Internal server error\"}");
            }
        }
    }
}

pub fn snapshot_message(snapshot: &Snapshot) -> ServerMessage {
    let mut message = ServerMessage::new("state");
    message.fen = Some(snapshot.fen.clone());
    message.side = snapshot.side;
    message.turn = snapshot.turn;
    message.player_to_move = Some(snapshot.player_to_move);
    message.moves = Some(snapshot.moves.clone());
    message.highlights = Some(snapshot.highlights.clone());
    message.game_over = snapshot.terminal_message.clone();
    message
}

pub fn event_message(event: &GameEvent) -> ServerMessage {
    match event {
        GameEvent::SideSelected(side) => {
            let mut message = ServerMessage::new("side");
            message.side = *side;
            message
        }
        GameEvent::SessionStarted { side, .. } => {
            let mut message = ServerMessage::new("started");
            message.side = Some(*side);
            message.moves = Some(Vec::new());
            message
        }
        GameEvent::PositionChanged { fen } => {
            let mut message = ServerMessage::new("position");
            message.fen = Some(fen.clone());
            message
        }
        GameEvent::MoveLogged(record) => {
            let mut message = ServerMessage::new("move");
            message.last_move = Some(record.clone());
            message
        }
        GameEvent::MovesUndone { count } => {
            let mut message = ServerMessage::new("undo");
            message.undone = Some(*count);
            message
        }
        GameEvent::Highlights(highlights) => {
            let mut message = ServerMessage::new("highlights");
            message.highlights = Some(highlights.clone());
            message
        }
        GameEvent::TurnChanged { player_to_move } => {
            let mut message = ServerMessage::new("turn");
            message.player_to_move = Some(*player_to_move);
            message
        }
        GameEvent::GameOver { message: text } => {
            let mut message = ServerMessage::new("game_over");
            message.game_over = Some(text.clone());
            message
        }
        GameEvent::Sound(sound) => {
            let mut message = ServerMessage::new("sound");
            message.sound = Some(*sound);
            message
        }
        GameEvent::SessionReset => ServerMessage::new("reset"),
    }
}

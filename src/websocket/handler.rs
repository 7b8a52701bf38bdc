use std::sync::atomic::Ordering;
use std::sync::Arc;

use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::engine::worker::SuggestionWorker;
use crate::game::Orchestrator;
use crate::models::*;

/// WebSocket handler for one player's browser. Owns that player's game.
pub struct GameSocket {
    pub id: String,
    pub app_state: web::Data<AppState>,
    pub orchestrator: Orchestrator,
    pub worker: Option<Addr<SuggestionWorker>>,
}

impl GameSocket {
    pub fn new(app_state: web::Data<AppState>) -> Self {
        let orchestrator = Orchestrator::new(app_state.config.terminal_delay);
        GameSocket {
            id: Uuid::new_v4().to_string(),
            app_state,
            orchestrator,
            worker: None,
        }
    }
}

impl Actor for GameSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        // One worker per connection, answering to this actor only
        let worker = SuggestionWorker::new(
            Arc::clone(&self.app_state.engine),
            ctx.address().recipient(),
            self.app_state.config.engine_timeout,
        )
        .start();
        self.worker = Some(worker);

        let total_sessions = self.app_state.active_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        info!("WebSocket connection started: {}", self.id);
        info!("Total active sessions: {}", total_sessions);

        self.send_state(ctx);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        if let Some(worker) = self.worker.take() {
            worker.do_send(Shutdown);
        }
        let total_sessions = self.app_state.active_sessions.fetch_sub(1, Ordering::SeqCst) - 1;
        info!("WebSocket connection closed: {}", self.id);
        info!("Total active sessions: {}", total_sessions);
    }
}

impl Handler<WorkerReply> for GameSocket {
    type Result = ();

    fn handle(&mut self, msg: WorkerReply, ctx: &mut Self::Context) {
        debug!("Worker reply for session {}: {:?}", msg.session, msg.response);
        let result = self.orchestrator.remote_reply(msg.session, msg.response);
        self.apply(result, ctx);
    }
}

impl Handler<FinalizeTerminal> for GameSocket {
    type Result = ();

    fn handle(&mut self, msg: FinalizeTerminal, ctx: &mut Self::Context) {
        let result = self.orchestrator.finalize_terminal(msg.0);
        self.apply(result, ctx);
    }
}

// WebSocket message handler
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for GameSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                debug!("Received text message: {}", text);
                match serde_json::from_str::<ClientMessage>(text.as_ref()) {
                    Ok(client_msg) => self.handle_message(client_msg, ctx),
                    Err(e) => {
                        warn!("Error parsing client message: {}", e);
                        self.send_error("invalid-message", &format!("Invalid message format: {}", e), ctx);
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                self.send_error("invalid-message", "Binary messages are not supported", ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

/// WebSocket connection handler
pub async fn ws_index(req: HttpRequest, stream: web::Payload, app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let socket = GameSocket::new(app_state);
    info!("New WebSocket connection: {}", socket.id);
    ws::start(socket, &req, stream)
}

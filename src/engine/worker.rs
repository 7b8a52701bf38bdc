use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use log::{debug, info, warn};

use crate::engine::SuggestionService;
use crate::error::EngineError;
use crate::models::{PositionRequest, Shutdown, WorkerReply, WorkerRequest, WorkerResponse};

/// Runs engine requests for one browser connection.
///
/// Replies go to the single recipient given at construction. Requests still
/// running when the worker stops are dropped with it.
pub struct SuggestionWorker {
    service: Arc<dyn SuggestionService>,
    reply_to: Recipient<WorkerReply>,
    timeout: Duration,
}

impl SuggestionWorker {
    pub fn new(service: Arc<dyn SuggestionService>, reply_to: Recipient<WorkerReply>, timeout: Duration) -> Self {
        SuggestionWorker {
            service,
            reply_to,
            timeout,
        }
    }
}

impl Actor for SuggestionWorker {
    type Context = Context<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        debug!("Suggestion worker started");
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        debug!("Suggestion worker stopped");
    }
}

impl Handler<PositionRequest> for SuggestionWorker {
    type Result = ();

    fn handle(&mut self, msg: PositionRequest, ctx: &mut Self::Context) {
        info!("Engine request for session {}", msg.session);
        let service = Arc::clone(&self.service);
        let reply_to = self.reply_to.clone();
        let timeout = self.timeout;

        let request = async move {
            let response = suggest(service.as_ref(), msg.request, timeout).await;
            reply_to.do_send(WorkerReply {
                session: msg.session,
                response,
            });
        };
        ctx.spawn(request.into_actor(self));
    }
}

impl Handler<Shutdown> for SuggestionWorker {
    type Result = ();

    fn handle(&mut self, _: Shutdown, ctx: &mut Self::Context) {
        ctx.stop();
    }
}

/// Answer one request, turning failures and timeouts into `error` replies.
pub async fn suggest(service: &dyn SuggestionService, request: WorkerRequest, timeout: Duration) -> WorkerResponse {
    let WorkerRequest::Position { fen } = request;
    match actix_rt::time::timeout(timeout, service.best_move(&fen)).await {
        Ok(Ok(best)) => WorkerResponse::BestMove { best },
        Ok(Err(e)) => {
            warn!("Engine request failed: {}", e);
            WorkerResponse::Error { message: e.to_string() }
        }
        Err(_) => {
            let e = EngineError::Timeout(timeout.as_millis() as u64);
            warn!("{}", e);
            WorkerResponse::Error { message: e.to_string() }
        }
    }
}

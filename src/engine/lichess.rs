use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, warn};
use serde::Deserialize;

use crate::config::Config;
use crate::engine::{split_uci, SuggestionService};
use crate::error::EngineError;
use crate::models::SuggestedMove;

/// Lichess cloud evaluation response; only the principal variations matter.
#[derive(Deserialize, Debug)]
pub struct CloudEval {
    #[serde(default)]
    pub pvs: Vec<PrincipalVariation>,
}

#[derive(Deserialize, Debug)]
pub struct PrincipalVariation {
    #[serde(default)]
    pub moves: String,
}

impl CloudEval {
    /// First move of the first principal variation.
    pub fn best_move(&self) -> Result<SuggestedMove, EngineError> {
        let uci = self
            .pvs
            .first()
            .and_then(|pv| pv.moves.split_whitespace().next())
            .ok_or(EngineError::NoBestMove)?;
        split_uci(uci)
    }
}

/// Move suggestions from the Lichess cloud-eval endpoint.
pub struct LichessCloudEval {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    request_delay: Duration,
}

impl LichessCloudEval {
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(LichessCloudEval {
            client,
            api_url: config.lichess_api_url.clone(),
            token: config.lichess_api_token.clone(),
            request_delay: config.engine_request_delay,
        })
    }

    async fn fetch(&self, fen: &str) -> Result<SuggestedMove, EngineError> {
        actix_rt::time::sleep(self.request_delay).await;

        debug!("Requesting cloud eval for {}", fen);
        let mut request = self.client.get(&self.api_url).query(&[("fen", fen)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Cloud eval returned {} for {}", status, fen);
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let eval: CloudEval = response.json().await?;
        eval.best_move()
    }
}

impl SuggestionService for LichessCloudEval {
    fn best_move<'a>(&'a self, fen: &'a str) -> BoxFuture<'a, Result<SuggestedMove, EngineError>> {
        Box::pin(self.fetch(fen))
    }
}

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::SuggestionService;

/// Application state shared between connections
pub struct AppState {
    pub config: Config,
    pub engine: Arc<dyn SuggestionService>,
    pub active_sessions: AtomicUsize,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn SuggestionService>) -> Self {
        AppState {
            config,
            engine,
            active_sessions: AtomicUsize::new(0),
        }
    }
}

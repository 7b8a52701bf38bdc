pub mod events;
pub mod orchestrator;
pub mod rules;
pub mod utils;

pub use orchestrator::{Orchestrator, Snapshot};

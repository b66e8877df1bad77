pub mod orchestrator;
pub mod types;

pub use orchestrator::{plan_session, SessionOrchestrator};
pub use types::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One live session as reported by the terminal application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSessionInfo {
    pub window_id: String,
    pub session_id: String,
    pub name: String,
}

/// A freshly created window and the session of its first tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWindow {
    pub window_id: String,
    pub session_id: String,
}

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("Failed to run osascript: {0}")]
    Spawn(#[from] std::io::Error),

    /// The script ran but the terminal reported an error.
    #[error("Terminal script failed: {0}")]
    Script(String),

    #[error("Unexpected terminal response: {0}")]
    Response(String),
}

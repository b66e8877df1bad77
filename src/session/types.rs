use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What is known about the shared window before a session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowHint {
    /// No workers exist, so a fresh window is made.
    None,
    /// Workers exist but no window is cached; look for the marker.
    Discover,
    /// Cached in the registry; re-checked by discovery before use.
    Hinted(String),
    /// Seen alive earlier in this run.
    Verified(String),
}

impl WindowHint {
    /// Only an empty registry skips discovery. Failed workers can leave a
    /// marker window behind without a cached id.
    pub fn from_registry(has_workers: bool, handle: Option<String>) -> Self {
        match (has_workers, handle) {
            (false, _) => WindowHint::None,
            (true, Some(id)) => WindowHint::Hinted(id),
            (true, None) => WindowHint::Discover,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub window: WindowHint,
    pub worker_name: String,
    pub directory: PathBuf,
    pub dev_command: Option<String>,
    pub agent_command: String,
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub window_id: String,
    /// Primary pane of the worker tab; closing it closes the whole tab.
    pub session_handle: String,
    pub agent_session: String,
    pub created_window: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Primary,
    Agent,
}

/// One stage of the session initialization protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
    CreateWindow,
    NameMarker,
    CreateTab,
    NameTab(String),
    InjectCommand { pane: Pane, command: String },
    Split,
    AwaitDelay(Duration),
    InjectTask(String),
    Confirm,
}

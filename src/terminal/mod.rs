pub mod iterm;
pub mod script;
pub mod types;

use async_trait::async_trait;

pub use iterm::ITermController;
pub use types::*;

/// Imperative control over the terminal application hosting worker sessions.
///
/// Every call is a request with a plain-text answer; there is no way to
/// observe what the processes inside a session are doing.
#[async_trait]
pub trait TerminalControl: Send + Sync {
    async fn is_running(&self) -> Result<bool, TerminalError>;

    /// Launches the application if needed and brings it to the front.
    async fn activate(&self) -> Result<(), TerminalError>;

    async fn list_sessions(&self) -> Result<Vec<TerminalSessionInfo>, TerminalError>;

    async fn create_window(&self) -> Result<NewWindow, TerminalError>;

    /// Opens a tab in `window_id` and returns the id of its session.
    async fn create_tab(&self, window_id: &str) -> Result<String, TerminalError>;

    /// Splits the session vertically and returns the new pane's session id.
    async fn split_vertically(&self, session_id: &str) -> Result<String, TerminalError>;

    async fn set_name(&self, session_id: &str, name: &str) -> Result<(), TerminalError>;

    /// Types `text` into the session followed by a newline.
    async fn write_text(&self, session_id: &str, text: &str) -> Result<(), TerminalError>;

    /// Sends Ctrl-C.
    async fn interrupt(&self, session_id: &str) -> Result<(), TerminalError>;

    /// Closes the tab containing the session.
    async fn close_tab(&self, session_id: &str) -> Result<(), TerminalError>;

    /// Selects the tab containing the session. `false` if it no longer exists.
    async fn select(&self, session_id: &str) -> Result<bool, TerminalError>;
}

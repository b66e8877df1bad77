use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use super::script;
use super::types::{NewWindow, TerminalError, TerminalSessionInfo};
use super::TerminalControl;

/// Drives iTerm2 through `osascript`.
pub struct ITermController {
    osascript: String,
}

impl ITermController {
    pub fn new() -> Self {
        Self {
            osascript: "osascript".to_string(),
        }
    }

    async fn run_script(&self, source: &str) -> Result<String, TerminalError> {
        trace!("Running AppleScript:\n{}", source);
        let output = Command::new(&self.osascript)
            .arg("-e")
            .arg(source)
            .output()
            .await?;

        if !output.status.success() {
            return Err(TerminalError::Script(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Runs a session-targeted script and turns a missing session into an error.
    async fn run_on_session(&self, session_id: &str, source: &str) -> Result<(), TerminalError> {
        let output = self.run_script(source).await?;
        if script::parse_ack(&output)? {
            Ok(())
        } else {
            Err(TerminalError::Script(format!("session {} not found", session_id)))
        }
    }
}

impl Default for ITermController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TerminalControl for ITermController {
    async fn is_running(&self) -> Result<bool, TerminalError> {
        let output = self.run_script(&script::is_running()).await?;
        Ok(output.trim() == "true")
    }

    async fn activate(&self) -> Result<(), TerminalError> {
        self.run_script(&script::activate()).await?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<TerminalSessionInfo>, TerminalError> {
        let output = self.run_script(&script::list_sessions()).await?;
        Ok(script::parse_session_list(&output))
    }

    async fn create_window(&self) -> Result<NewWindow, TerminalError> {
        let output = self.run_script(&script::create_window()).await?;
        let window = script::parse_new_window(&output)?;
        debug!("Created iTerm2 window {}", window.window_id);
        Ok(window)
    }

    async fn create_tab(&self, window_id: &str) -> Result<String, TerminalError> {
        let window_id = script::parse_window_id(window_id)?;
        let output = self.run_script(&script::create_tab(window_id)).await?;
        let session_id = output.trim();
        if session_id.is_empty() {
            return Err(TerminalError::Response("empty session id for new tab".to_string()));
        }
        Ok(session_id.to_string())
    }

    async fn split_vertically(&self, session_id: &str) -> Result<String, TerminalError> {
        let output = self.run_script(&script::split_vertically(session_id)).await?;
        match output.trim() {
            script::MISSING => Err(TerminalError::Script(format!(
                "session {} not found",
                session_id
            ))),
            "" => Err(TerminalError::Response("empty session id for split pane".to_string())),
            new_session => Ok(new_session.to_string()),
        }
    }

    async fn set_name(&self, session_id: &str, name: &str) -> Result<(), TerminalError> {
        self.run_on_session(session_id, &script::set_name(session_id, name))
            .await
    }

    async fn write_text(&self, session_id: &str, text: &str) -> Result<(), TerminalError> {
        self.run_on_session(session_id, &script::write_text(session_id, text))
            .await
    }

    async fn interrupt(&self, session_id: &str) -> Result<(), TerminalError> {
        self.run_on_session(session_id, &script::interrupt(session_id))
            .await
    }

    async fn close_tab(&self, session_id: &str) -> Result<(), TerminalError> {
        self.run_on_session(session_id, &script::close_tab(session_id))
            .await
    }

    async fn select(&self, session_id: &str) -> Result<bool, TerminalError> {
        let output = self.run_script(&script::select(session_id)).await?;
        script::parse_ack(&output)
    }
}

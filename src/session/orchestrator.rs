use std::path::Path;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::types::*;
use crate::config::SessionTimings;
use crate::terminal::{TerminalControl, TerminalError};

/// Builds the ordered protocol for one worker tab.
///
/// A window step pair is only planned when `window_known` is false. The
/// task is delivered blind: nothing confirms the agent is ready for it.
pub fn plan_session(request: &SessionRequest, window_known: bool, timings: &SessionTimings) -> Vec<SessionStep> {
    let mut steps = Vec::new();

    if !window_known {
        steps.push(SessionStep::CreateWindow);
        steps.push(SessionStep::NameMarker);
    }

    steps.push(SessionStep::CreateTab);
    steps.push(SessionStep::NameTab(request.worker_name.clone()));

    if let Some(dev_command) = &request.dev_command {
        steps.push(SessionStep::InjectCommand {
            pane: Pane::Primary,
            command: in_directory(&request.directory, dev_command),
        });
        steps.push(SessionStep::Split);
    }

    steps.push(SessionStep::InjectCommand {
        pane: Pane::Agent,
        command: in_directory(&request.directory, &request.agent_command),
    });
    steps.push(SessionStep::AwaitDelay(timings.agent_boot()));
    steps.push(SessionStep::InjectTask(single_line(&request.task)));
    steps.push(SessionStep::AwaitDelay(timings.confirm()));
    steps.push(SessionStep::Confirm);

    steps
}

fn in_directory(directory: &Path, command: &str) -> String {
    format!("cd {} && {}", shell_quote(&directory.to_string_lossy()), command)
}

/// `write text` types every newline as Enter, which would submit each line
/// of a task as its own prompt.
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[derive(Default)]
struct SessionContext {
    window_id: Option<String>,
    marker_session: Option<String>,
    primary: Option<String>,
    agent: Option<String>,
}

impl SessionContext {
    fn require<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, TerminalError> {
        value
            .as_deref()
            .ok_or_else(|| TerminalError::Response(format!("{} not created yet", what)))
    }

    fn pane(&self, pane: Pane) -> Result<&str, TerminalError> {
        match pane {
            Pane::Primary => Self::require(&self.primary, "primary pane"),
            Pane::Agent => Self::require(&self.agent, "agent pane"),
        }
    }
}

pub struct SessionOrchestrator {
    terminal: Arc<dyn TerminalControl>,
    marker_name: String,
    timings: SessionTimings,
}

impl SessionOrchestrator {
    pub fn new(terminal: Arc<dyn TerminalControl>, marker_name: impl Into<String>, timings: SessionTimings) -> Self {
        Self {
            terminal,
            marker_name: marker_name.into(),
            timings,
        }
    }

    pub fn marker_name(&self) -> &str {
        &self.marker_name
    }

    fn is_marker(&self, name: &str) -> bool {
        let name = name.trim();
        name == self.marker_name
            || name
                .strip_prefix(self.marker_name.as_str())
                .is_some_and(|rest| rest.starts_with(" ("))
    }

    /// Scans live sessions for the marker and returns its window.
    pub async fn discover_shared_window(&self) -> Result<Option<String>, TerminalError> {
        let sessions = self.terminal.list_sessions().await?;
        Ok(sessions
            .into_iter()
            .find(|s| self.is_marker(&s.name))
            .map(|s| s.window_id))
    }

    async fn ensure_running(&self) -> Result<(), TerminalError> {
        if !self.terminal.is_running().await? {
            info!("Terminal is not running, launching it");
            self.terminal.activate().await?;
            sleep(self.timings.launch_settle()).await;
        }
        Ok(())
    }

    async fn resolve_window(&self, hint: &WindowHint) -> Result<Option<String>, TerminalError> {
        match hint {
            WindowHint::Verified(id) => Ok(Some(id.clone())),
            WindowHint::None => Ok(None),
            WindowHint::Discover => {
                let found = self.discover_shared_window().await?;
                if let Some(id) = &found {
                    debug!("Found shared window {} without a cached hint", id);
                }
                Ok(found)
            }
            WindowHint::Hinted(cached) => {
                let found = self.discover_shared_window().await?;
                match &found {
                    Some(id) if id != cached => {
                        debug!("Shared window moved from {} to {}", cached, id)
                    }
                    Some(_) => {}
                    None => warn!("Shared window {} is gone, creating a new one", cached),
                }
                Ok(found)
            }
        }
    }

    /// Attaches a worker tab to the shared window, creating the window first
    /// when none can be found.
    pub async fn create_session(&self, request: &SessionRequest) -> Result<SessionOutcome, TerminalError> {
        self.ensure_running().await?;

        let window = self.resolve_window(&request.window).await?;
        let created_window = window.is_none();
        let steps = plan_session(request, !created_window, &self.timings);

        let mut ctx = SessionContext {
            window_id: window,
            ..SessionContext::default()
        };
        for step in &steps {
            self.run_step(step, &mut ctx).await?;
        }

        let outcome = SessionOutcome {
            window_id: SessionContext::require(&ctx.window_id, "window")?.to_string(),
            session_handle: ctx.pane(Pane::Primary)?.to_string(),
            agent_session: ctx.pane(Pane::Agent)?.to_string(),
            created_window,
        };
        info!(
            "Session for {} is up in window {} (session {})",
            request.worker_name, outcome.window_id, outcome.session_handle
        );
        Ok(outcome)
    }

    async fn run_step(&self, step: &SessionStep, ctx: &mut SessionContext) -> Result<(), TerminalError> {
        debug!("Session step: {:?}", step);
        match step {
            SessionStep::CreateWindow => {
                let window = self.terminal.create_window().await?;
                ctx.window_id = Some(window.window_id);
                ctx.marker_session = Some(window.session_id);
            }
            SessionStep::NameMarker => {
                let marker = SessionContext::require(&ctx.marker_session, "marker session")?;
                self.terminal.set_name(marker, &self.marker_name).await?;
            }
            SessionStep::CreateTab => {
                let window_id = SessionContext::require(&ctx.window_id, "window")?;
                let session = self.terminal.create_tab(window_id).await?;
                ctx.agent = Some(session.clone());
                ctx.primary = Some(session);
            }
            SessionStep::NameTab(name) => {
                self.terminal.set_name(ctx.pane(Pane::Primary)?, name).await?;
            }
            SessionStep::InjectCommand { pane, command } => {
                self.terminal.write_text(ctx.pane(*pane)?, command).await?;
            }
            SessionStep::Split => {
                let agent = self.terminal.split_vertically(ctx.pane(Pane::Primary)?).await?;
                ctx.agent = Some(agent);
            }
            SessionStep::AwaitDelay(delay) => {
                if !delay.is_zero() {
                    sleep(*delay).await;
                }
            }
            SessionStep::InjectTask(task) => {
                self.terminal.write_text(ctx.pane(Pane::Agent)?, task).await?;
            }
            SessionStep::Confirm => {
                self.terminal.write_text(ctx.pane(Pane::Agent)?, "").await?;
            }
        }
        Ok(())
    }

    /// Interrupts both panes, waits, then closes the tab. Never fails.
    pub async fn close_session(&self, handle: &str, agent: Option<&str>) {
        let agent = agent.filter(|agent| *agent != handle);
        for session in agent.into_iter().chain([handle]) {
            if let Err(e) = self.terminal.interrupt(session).await {
                debug!("Interrupt for session {} failed: {}", session, e);
            }
        }
        sleep(self.timings.interrupt_grace()).await;
        if let Err(e) = self.terminal.close_tab(handle).await {
            debug!("Closing session {} failed: {}", handle, e);
        }
    }

    /// Returns `false` if the text could not be delivered.
    pub async fn send_text(&self, handle: &str, text: &str) -> bool {
        match self.terminal.write_text(handle, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not send text to session {}: {}", handle, e);
                false
            }
        }
    }

    /// Returns `false` if the session no longer exists.
    pub async fn focus_session(&self, handle: &str) -> bool {
        if let Err(e) = self.terminal.activate().await {
            debug!("Activating terminal failed: {}", e);
        }
        match self.terminal.select(handle).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Could not focus session {}: {}", handle, e);
                false
            }
        }
    }
}

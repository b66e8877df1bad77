use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRecord {
    pub id: String,
    pub name: String,
    pub repo_url: String,
    pub repo_name: String,
    pub branch: String,
    pub task: String,
    pub directory: PathBuf,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_handle: Option<String>,
    /// Right pane when the tab is split for a dev server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_session_handle: Option<String>,
    pub created_at: String,
    pub status: WorkerStatus,
}

impl WorkerRecord {
    pub fn matches(&self, name_or_id: &str) -> bool {
        self.name == name_or_id || self.id == name_or_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerStatus {
    SettingUp,
    Running,
    Stopped,
    Failed,
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::SettingUp => write!(f, "setting-up"),
            WorkerStatus::Running => write!(f, "running"),
            WorkerStatus::Stopped => write!(f, "stopped"),
            WorkerStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for WorkerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setting-up" => Ok(WorkerStatus::SettingUp),
            "running" => Ok(WorkerStatus::Running),
            "stopped" => Ok(WorkerStatus::Stopped),
            "failed" => Ok(WorkerStatus::Failed),
            other => Err(format!("Unknown worker status: {}", other)),
        }
    }
}

/// The whole persisted document. Always written back in one piece.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryState {
    #[serde(default)]
    pub workers: Vec<WorkerRecord>,
    /// Never decremented, so ports are not handed out twice.
    #[serde(default)]
    pub next_port_offset: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_window_handle: Option<String>,
}

impl RegistryState {
    pub fn find(&self, name_or_id: &str) -> Option<&WorkerRecord> {
        self.workers.iter().find(|w| w.matches(name_or_id))
    }

    pub fn find_mut(&mut self, name_or_id: &str) -> Option<&mut WorkerRecord> {
        self.workers.iter_mut().find(|w| w.matches(name_or_id))
    }
}

use serde::{Deserialize, Serialize};

use crate::registry::WorkerRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub repo_url: String,
    pub task: String,
    /// Overrides the generated branch name.
    pub branch: Option<String>,
    /// Overrides the configured agent command.
    pub agent_command: Option<String>,
    pub dev_server: bool,
    pub install: bool,
}

impl SpawnRequest {
    pub fn new(repo_url: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            task: task.into(),
            branch: None,
            agent_command: None,
            dev_server: true,
            install: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanupOutcome {
    pub record: WorkerRecord,
    /// False when the working copy could not be deleted and needs manual removal.
    pub directory_removed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    /// Names of the workers considered, in registry order.
    pub workers: Vec<String>,
    pub removed: usize,
    /// One line per worker that was not cleaned completely.
    pub errors: Vec<String>,
}

impl CleanupReport {
    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}

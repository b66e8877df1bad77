use std::path::PathBuf;
use thiserror::Error;

use crate::terminal::TerminalError;

#[derive(Debug, Error)]
pub enum SquadError {
    #[error("Worker {0} not found")]
    NotFound(String),

    #[error("Worker directory {0} already exists")]
    DirectoryExists(PathBuf),

    /// An external setup step (clone, checkout, install) failed.
    #[error("{step} failed: {message}")]
    Setup { step: String, message: String },

    #[error("No free port left at offset {offset}; clean up workers or lower the base port")]
    PortsExhausted { offset: u32 },

    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SquadError {
    pub fn setup(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SquadError>;

use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::types::RegistryState;
use crate::error::Result;

/// Whole-document persistence for the registry.
///
/// `load` never fails: a missing or corrupt store reads as the empty state.
/// `save` overwrites everything; callers load, mutate and save in one go.
pub trait StateStore: Send + Sync {
    fn load(&self) -> RegistryState;
    fn save(&self, state: &RegistryState) -> Result<()>;
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> RegistryState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return RegistryState::default();
            }
            Err(e) => {
                warn!("Could not read state file {}: {}", self.path.display(), e);
                return RegistryState::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring corrupt state file {}: {}", self.path.display(), e);
                RegistryState::default()
            }
        }
    }

    fn save(&self, state: &RegistryState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)?;
        debug!("Saved {} workers to {}", state.workers.len(), self.path.display());
        Ok(())
    }
}

/// Keeps the state in memory only.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<RegistryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: RegistryState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> RegistryState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn save(&self, state: &RegistryState) -> Result<()> {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = state.clone();
        Ok(())
    }
}

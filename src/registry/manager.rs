use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::store::StateStore;
use super::types::{RegistryState, WorkerRecord};
use crate::error::Result;

/// Load-mutate-save access to the persisted worker registry.
///
/// Every mutation rereads the store first, so the registry holds no cached
/// state of its own. Nothing guards against a second process writing the
/// same file in between.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn StateStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn snapshot(&self) -> RegistryState {
        self.store.load()
    }

    pub fn list(&self) -> Vec<WorkerRecord> {
        self.store.load().workers
    }

    pub fn find(&self, name_or_id: &str) -> Option<WorkerRecord> {
        self.store.load().find(name_or_id).cloned()
    }

    pub fn existing_names(&self) -> HashSet<String> {
        self.store
            .load()
            .workers
            .into_iter()
            .map(|w| w.name)
            .collect()
    }

    /// Appends the record and advances the port offset in the same save.
    pub fn add_worker(&self, record: WorkerRecord) -> Result<()> {
        let mut state = self.store.load();
        debug!("Registering worker {} on port {}", record.name, record.port);
        state.workers.push(record);
        state.next_port_offset += 1;
        self.store.save(&state)
    }

    /// Applies `update` to the matching record. Returns the updated record,
    /// or `None` without saving when nothing matches.
    pub fn update_worker<F>(&self, name_or_id: &str, update: F) -> Result<Option<WorkerRecord>>
    where
        F: FnOnce(&mut WorkerRecord),
    {
        let mut state = self.store.load();
        let updated = match state.find_mut(name_or_id) {
            Some(record) => {
                update(record);
                record.clone()
            }
            None => return Ok(None),
        };
        self.store.save(&state)?;
        Ok(Some(updated))
    }

    /// Removes the matching record. Clears the shared window hint when the
    /// last worker goes. An unknown key changes nothing.
    pub fn remove_worker(&self, name_or_id: &str) -> Result<Option<WorkerRecord>> {
        let mut state = self.store.load();
        let Some(index) = state.workers.iter().position(|w| w.matches(name_or_id)) else {
            return Ok(None);
        };

        let removed = state.workers.remove(index);
        if state.workers.is_empty() {
            state.shared_window_handle = None;
        }
        self.store.save(&state)?;
        debug!("Removed worker {} ({} left)", removed.name, state.workers.len());
        Ok(Some(removed))
    }

    pub fn shared_window(&self) -> Option<String> {
        self.store.load().shared_window_handle
    }

    pub fn set_shared_window(&self, handle: Option<String>) -> Result<()> {
        let mut state = self.store.load();
        if state.shared_window_handle == handle {
            return Ok(());
        }
        state.shared_window_handle = handle;
        self.store.save(&state)
    }
}

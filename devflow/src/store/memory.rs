//! In-memory run state store.

use super::{RunState, RunStateStore, StageRecord};
use crate::errors::StoreError;
use dashmap::DashMap;

/// A run state store backed by a concurrent map.
///
/// Per-project write serialization comes from the map's per-entry locks.
/// Intended for tests and short-lived embedded use; nothing survives the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, RunState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStateStore for MemoryStore {
    fn create(&self, state: &RunState) -> Result<(), StoreError> {
        match self.records.entry(state.project_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StoreError::already_exists(&state.project_id))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(state.clone());
                Ok(())
            }
        }
    }

    fn load(&self, project_id: &str) -> Result<RunState, StoreError> {
        self.records
            .get(project_id)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::not_found(project_id))
    }

    fn append(&self, project_id: &str, record: StageRecord) -> Result<(), StoreError> {
        let mut entry = self
            .records
            .get_mut(project_id)
            .ok_or_else(|| StoreError::not_found(project_id))?;
        entry.record(record);
        Ok(())
    }

    fn replace(&self, state: &RunState) -> Result<(), StoreError> {
        let mut entry = self
            .records
            .get_mut(&state.project_id)
            .ok_or_else(|| StoreError::not_found(&state.project_id))?;
        *entry = state.clone();
        Ok(())
    }

    fn delete(&self, project_id: &str) -> Result<(), StoreError> {
        self.records
            .remove(project_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(project_id))
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

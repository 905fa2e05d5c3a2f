//! JSON-file-backed run state store.
//!
//! One JSON document per project under a base directory. Writes go to a
//! sibling temp file and are renamed into place, so a crash mid-write
//! leaves the previous record fully readable. A per-project mutex
//! serializes writers without blocking unrelated projects.

use super::{RunState, RunStateStore, StageRecord};
use crate::errors::StoreError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A run state store persisting one JSON document per project.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl JsonFileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            locks: DashMap::new(),
        })
    }

    fn record_path(&self, project_id: &str) -> PathBuf {
        self.dir.join(format!("{project_id}.json"))
    }

    fn lock_for(&self, project_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn read_record(path: &Path, project_id: &str) -> Result<RunState, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(project_id));
            }
            Err(err) => return Err(err.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write_record(&self, state: &RunState) -> Result<(), StoreError> {
        let path = self.record_path(&state.project_id);
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl RunStateStore for JsonFileStore {
    fn create(&self, state: &RunState) -> Result<(), StoreError> {
        let lock = self.lock_for(&state.project_id);
        let _guard = lock.lock();

        if self.record_path(&state.project_id).exists() {
            return Err(StoreError::already_exists(&state.project_id));
        }
        self.write_record(state)
    }

    fn load(&self, project_id: &str) -> Result<RunState, StoreError> {
        Self::read_record(&self.record_path(project_id), project_id)
    }

    fn append(&self, project_id: &str, record: StageRecord) -> Result<(), StoreError> {
        let lock = self.lock_for(project_id);
        let _guard = lock.lock();

        let mut state = Self::read_record(&self.record_path(project_id), project_id)?;
        state.record(record);
        self.write_record(&state)
    }

    fn replace(&self, state: &RunState) -> Result<(), StoreError> {
        let lock = self.lock_for(&state.project_id);
        let _guard = lock.lock();

        if !self.record_path(&state.project_id).exists() {
            return Err(StoreError::not_found(&state.project_id));
        }
        self.write_record(state)
    }

    fn delete(&self, project_id: &str) -> Result<(), StoreError> {
        let lock = self.lock_for(project_id);
        let _guard = lock.lock();

        match fs::remove_file(self.record_path(project_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(project_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

//! Durable run state storage.
//!
//! One record per project. `append` is atomic with respect to process
//! crash: either the new stage record is durably visible or it is not.
//! Writes for the same project are serialized; unrelated projects never
//! block each other.

mod file;
mod memory;
mod state;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use state::{RunState, StageRecord};

use crate::errors::StoreError;

/// Trait for run state stores.
///
/// Each project's state is exclusively owned by the dispatcher instance
/// driving that project; stores only have to arbitrate the durable record.
pub trait RunStateStore: Send + Sync {
    /// Creates the record for a new project.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the project already has a record.
    fn create(&self, state: &RunState) -> Result<(), StoreError>;

    /// Loads a project's record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists.
    fn load(&self, project_id: &str) -> Result<RunState, StoreError>;

    /// Atomically appends a completed stage record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists, or an IO/serialization
    /// error if the durable write fails. After a failed append the prior
    /// record remains intact and the stage is safely retryable.
    fn append(&self, project_id: &str, record: StageRecord) -> Result<(), StoreError>;

    /// Replaces a project's whole record (tier updates, resume resets).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists.
    fn replace(&self, state: &RunState) -> Result<(), StoreError>;

    /// Returns a read-only copy of a project's record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists.
    fn snapshot(&self, project_id: &str) -> Result<RunState, StoreError> {
        self.load(project_id)
    }

    /// Deletes a project's record. Explicit deletion only; nothing in the
    /// core deletes implicitly.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record exists.
    fn delete(&self, project_id: &str) -> Result<(), StoreError>;

    /// Lists known project ids.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the backing storage cannot be enumerated.
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

//! Error types for the devflow orchestration core.
//!
//! The taxonomy separates load-time configuration problems (fatal before
//! any project runs) from per-run validation, worker, and storage failures.

use thiserror::Error;

/// The main error type for devflow operations.
#[derive(Debug, Error)]
pub enum DevflowError {
    /// An envelope failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A worker reported failure or the invocation itself errored.
    #[error("{0}")]
    Worker(#[from] WorkerError),

    /// The stage or contract registry is misconfigured.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A durable read or write failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The run was cancelled between stages.
    #[error("run cancelled: {0}")]
    Cancelled(String),

    /// A generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Envelope validation failures.
///
/// These are surfaced to the caller with the offending stage id and field
/// list, never silently patched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A completed envelope is missing fields a downstream consumer requires.
    #[error(
        "stage '{stage}' envelope is missing required fields for consumer '{consumer}': {}",
        fields.join(", ")
    )]
    MissingDownstreamFields {
        /// The producer stage whose envelope is deficient.
        stage: String,
        /// The consumer stage the fields were required for.
        consumer: String,
        /// The missing (or empty) field names.
        fields: Vec<String>,
    },

    /// An artifact descriptor has an empty `path` or `name`.
    #[error("stage '{stage}' artifact at index {index} is malformed: {reason}")]
    MalformedArtifact {
        /// The producer stage.
        stage: String,
        /// Index into `generated_artifacts`.
        index: usize,
        /// What was wrong with the descriptor.
        reason: String,
    },

    /// The envelope `status` is not a recognized value.
    #[error("stage '{stage}' envelope has unknown status '{value}'")]
    UnknownStatus {
        /// The producer stage.
        stage: String,
        /// The unrecognized status string.
        value: String,
    },

    /// The worker's result is not a well-formed envelope record.
    #[error("stage '{stage}' returned a malformed envelope: {reason}")]
    MalformedEnvelope {
        /// The producer stage.
        stage: String,
        /// What failed to parse.
        reason: String,
    },
}

/// Worker boundary failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The worker reported `status: failed`.
    #[error("worker for stage '{stage}' failed: {reason}")]
    Failed {
        /// The stage being executed.
        stage: String,
        /// The worker's reported reason.
        reason: String,
    },

    /// The invocation itself errored before producing an envelope.
    #[error("worker invocation for stage '{stage}' errored: {reason}")]
    Invocation {
        /// The stage being executed.
        stage: String,
        /// The invocation error.
        reason: String,
    },

    /// The worker boundary imposed a timeout.
    #[error("worker for stage '{stage}' timed out after {seconds}s")]
    Timeout {
        /// The stage being executed.
        stage: String,
        /// The timeout that elapsed.
        seconds: u64,
    },
}

impl WorkerError {
    /// Creates a `Failed` error.
    #[must_use]
    pub fn failed(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Invocation` error.
    #[must_use]
    pub fn invocation(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invocation {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// Stage/contract registry configuration errors.
///
/// Detected while the registries are built, before any project runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The requires-graph contains a cycle.
    #[error("stage graph contains a cycle: {}", path.join(" -> "))]
    CycleDetected {
        /// The stages forming the cycle, start repeated at the end.
        path: Vec<String>,
    },

    /// A stage requires a stage that was never declared.
    #[error("stage '{stage}' requires unknown stage '{dependency}'")]
    UnknownDependency {
        /// The declaring stage.
        stage: String,
        /// The missing predecessor id.
        dependency: String,
    },

    /// The same stage id was declared twice.
    #[error("stage '{stage}' is declared more than once")]
    DuplicateStage {
        /// The duplicated id.
        stage: String,
    },

    /// Two predecessors expose the same contract field to one consumer.
    #[error(
        "consumer '{consumer}' receives field '{field}' from multiple producers: {}",
        producers.join(", ")
    )]
    DuplicateFieldExposure {
        /// The consumer stage.
        consumer: String,
        /// The colliding field name.
        field: String,
        /// The producers exposing it.
        producers: Vec<String>,
    },

    /// The registry has no stages.
    #[error("stage registry is empty")]
    EmptyRegistry,
}

/// Durable storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the project.
    #[error("project '{project_id}' not found")]
    NotFound {
        /// The requested project.
        project_id: String,
    },

    /// A record already exists for the project.
    #[error("project '{project_id}' already exists")]
    AlreadyExists {
        /// The conflicting project.
        project_id: String,
    },

    /// An underlying IO operation failed.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted record could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(project_id: impl Into<String>) -> Self {
        Self::NotFound {
            project_id: project_id.into(),
        }
    }

    /// Creates an `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(project_id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            project_id: project_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_fields() {
        let err = ValidationError::MissingDownstreamFields {
            stage: "requirements".to_string(),
            consumer: "architecture".to_string(),
            fields: vec!["requirements".to_string(), "security_requirements".to_string()],
        };

        let msg = err.to_string();
        assert!(msg.contains("requirements"));
        assert!(msg.contains("architecture"));
        assert!(msg.contains("security_requirements"));
    }

    #[test]
    fn test_cycle_message_shows_path() {
        let err = ConfigurationError::CycleDetected {
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_worker_error_constructors() {
        let err = WorkerError::failed("implementation", "compiler unavailable");
        assert!(err.to_string().contains("implementation"));

        let err = WorkerError::invocation("review", "connection reset");
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_umbrella_from_wiring() {
        let err: DevflowError = ValidationError::UnknownStatus {
            stage: "testing".to_string(),
            value: "done".to_string(),
        }
        .into();
        assert!(matches!(err, DevflowError::Validation(_)));

        let err: DevflowError = StoreError::not_found("project_x").into();
        assert!(matches!(err, DevflowError::Store(_)));
    }

    #[test]
    fn test_duplicate_exposure_message() {
        let err = ConfigurationError::DuplicateFieldExposure {
            consumer: "implementation".to_string(),
            field: "technology_stack".to_string(),
            producers: vec!["architecture".to_string(), "design".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("technology_stack"));
        assert!(msg.contains("architecture, design"));
    }
}

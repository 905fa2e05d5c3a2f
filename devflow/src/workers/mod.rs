//! The worker boundary.
//!
//! Workers are external collaborators that perform the actual stage work.
//! The core hands a worker its assembled input bundle and receives back a
//! raw JSON record, which the envelope validator then checks. Workers are
//! expected to be safely re-runnable against the same bundle.

use crate::dispatch::InputBundle;
use crate::errors::WorkerError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for stage workers.
#[async_trait]
pub trait Worker: Send + Sync + Debug {
    /// Executes the stage and returns the raw envelope record.
    ///
    /// # Errors
    ///
    /// Returns a `WorkerError` if the invocation itself fails (transport,
    /// timeout); a worker that runs but cannot finish its stage should
    /// instead return an envelope with `status: failed`.
    async fn run(&self, bundle: &InputBundle) -> Result<serde_json::Value, WorkerError>;
}

/// A worker that returns a fixed envelope record.
#[derive(Debug, Clone)]
pub struct StaticWorker {
    response: serde_json::Value,
}

impl StaticWorker {
    /// Creates a worker that always returns `response`.
    #[must_use]
    pub fn new(response: serde_json::Value) -> Self {
        Self { response }
    }

    /// Creates a worker returning a minimal completed envelope.
    #[must_use]
    pub fn completed(summary: &str) -> Self {
        Self::new(serde_json::json!({
            "status": "completed",
            "summary": summary,
            "generated_artifacts": [],
            "downstream_inputs": {},
        }))
    }
}

#[async_trait]
impl Worker for StaticWorker {
    async fn run(&self, _bundle: &InputBundle) -> Result<serde_json::Value, WorkerError> {
        Ok(self.response.clone())
    }
}

/// A worker whose invocation always errors.
#[derive(Debug, Clone)]
pub struct FailingWorker {
    reason: String,
}

impl FailingWorker {
    /// Creates a worker that errors with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Worker for FailingWorker {
    async fn run(&self, bundle: &InputBundle) -> Result<serde_json::Value, WorkerError> {
        Err(WorkerError::invocation(&bundle.stage, &self.reason))
    }
}

/// A worker that records the bundles it was invoked with.
///
/// Wraps an inner worker and keeps a copy of every bundle, for asserting
/// what the dispatcher actually assembled.
#[derive(Debug)]
pub struct RecordingWorker<W> {
    inner: W,
    bundles: parking_lot::Mutex<Vec<InputBundle>>,
}

impl<W> RecordingWorker<W> {
    /// Wraps an inner worker.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bundles: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Returns copies of all recorded bundles.
    #[must_use]
    pub fn bundles(&self) -> Vec<InputBundle> {
        self.bundles.lock().clone()
    }

    /// Returns how many times the worker was invoked.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.bundles.lock().len()
    }
}

#[async_trait]
impl<W: Worker> Worker for RecordingWorker<W> {
    async fn run(&self, bundle: &InputBundle) -> Result<serde_json::Value, WorkerError> {
        self.bundles.lock().push(bundle.clone());
        self.inner.run(bundle).await
    }
}

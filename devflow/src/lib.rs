//! # Devflow
//!
//! A contract-driven orchestration core for multi-stage software
//! delivery pipelines.
//!
//! Devflow sequences independent workers (requirements analysis,
//! architecture, UI design, implementation, review, testing) over a
//! declared stage graph:
//!
//! - **Phase preconditions**: no stage runs before its predecessors have
//!   completed.
//! - **Typed edge contracts**: every field flowing between a producer and
//!   a consumer stage is declared up front and validated on every
//!   envelope, never discovered at runtime.
//! - **Complexity scaling**: a tier classified once from the initial
//!   request is threaded through every stage invocation.
//! - **Durable resumption**: progress is flushed at every stage boundary,
//!   and a project can be suspended and resumed without losing state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use devflow::prelude::*;
//!
//! let contracts = Arc::new(squad::contracts());
//! let registry = Arc::new(squad::registry(&contracts, worker_for)?);
//! let store = Arc::new(JsonFileStore::open("./projects")?);
//!
//! let orchestrator = Orchestrator::new(registry, contracts, store);
//! let report = orchestrator.start("project_1", "build a todo app").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod classify;
pub mod contracts;
pub mod core;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod project;
pub mod registry;
pub mod resume;
pub mod squad;
pub mod store;
pub mod utils;
pub mod validate;
pub mod workers;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::classify::{ComplexityClassifier, KeywordClassifier};
    pub use crate::contracts::ContractRegistry;
    pub use crate::core::{
        ArtifactDescriptor, ComplexityTier, Envelope, EnvelopeStatus, RunStatus, StageState,
    };
    pub use crate::dispatch::{Dispatcher, DriveOutcome, InputBundle, StageFailure};
    pub use crate::errors::{
        ConfigurationError, DevflowError, StoreError, ValidationError, WorkerError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::orchestrator::{Orchestrator, RunReport};
    pub use crate::registry::{StageRegistry, StageRegistryBuilder};
    pub use crate::resume::{ResumeController, ResumePlan, ResumeRequest};
    pub use crate::squad;
    pub use crate::store::{JsonFileStore, MemoryStore, RunState, RunStateStore, StageRecord};
    pub use crate::validate::{validate, ValidEnvelope};
    pub use crate::workers::Worker;
}

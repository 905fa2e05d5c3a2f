//! Core data types shared across the orchestration engine.

mod envelope;
mod status;
mod tier;

pub use envelope::{ArtifactDescriptor, DownstreamInputs, Envelope, FieldMap};
pub use status::{EnvelopeStatus, RunStatus, StageState};
pub use tier::ComplexityTier;

//! Persisted project run state.

use crate::core::{ComplexityTier, Envelope};
use crate::utils::iso_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One completed stage and its final envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// The stage id.
    pub stage: String,
    /// The validated envelope the stage completed with.
    pub envelope: Envelope,
    /// When the stage was durably recorded.
    pub completed_at: String,
}

impl StageRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(stage: impl Into<String>, envelope: Envelope) -> Self {
        Self {
            stage: stage.into(),
            envelope,
            completed_at: iso_timestamp(),
        }
    }
}

/// Durable representation of a single project's progress.
///
/// Created at project start, appended to as stages complete, destroyed
/// only by explicit deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Stable project identifier.
    pub project_id: String,

    /// The initial user request that started the project.
    pub request: String,

    /// The complexity tier, once established.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_tier: Option<ComplexityTier>,

    /// Completed stages in completion order, with their envelopes.
    #[serde(default)]
    pub completed_stages: Vec<StageRecord>,

    /// A new user request layered onto a previously-completed run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_increment: Option<String>,

    /// When the project was created.
    pub created_at: String,

    /// When the record was last written.
    pub updated_at: String,
}

impl RunState {
    /// Creates a fresh run state for a new project.
    #[must_use]
    pub fn new(project_id: impl Into<String>, request: impl Into<String>) -> Self {
        let now = iso_timestamp();
        Self {
            project_id: project_id.into(),
            request: request.into(),
            complexity_tier: None,
            completed_stages: Vec::new(),
            pending_increment: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Returns true if the stage has a completed record.
    #[must_use]
    pub fn is_completed(&self, stage: &str) -> bool {
        self.completed_stages.iter().any(|r| r.stage == stage)
    }

    /// Returns the envelope a stage completed with, if any.
    #[must_use]
    pub fn envelope_of(&self, stage: &str) -> Option<&Envelope> {
        self.completed_stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.envelope)
    }

    /// Returns the ids of completed stages in completion order.
    pub fn completed_ids(&self) -> impl Iterator<Item = &str> {
        self.completed_stages.iter().map(|r| r.stage.as_str())
    }

    /// The request the next stage invocations should be driven by: the
    /// pending increment if one is set, otherwise the original request.
    #[must_use]
    pub fn effective_request(&self) -> &str {
        self.pending_increment.as_deref().unwrap_or(&self.request)
    }

    /// Removes the records of the given stages, preserving all others.
    ///
    /// Used by the resume controller to reset an impacted stage and its
    /// downstream closure.
    pub fn reset_stages(&mut self, stages: &BTreeSet<String>) {
        self.completed_stages.retain(|r| !stages.contains(&r.stage));
        self.updated_at = iso_timestamp();
    }

    /// Appends a completed stage record.
    pub fn record(&mut self, record: StageRecord) {
        self.completed_stages.push(record);
        self.updated_at = iso_timestamp();
    }
}

//! Resume planning for previously-run projects.
//!
//! Which stages a new request "affects" is a judgment delegated to the
//! caller (an external classification step); the controller implements
//! only the mechanical consequence: resetting the impacted stages and
//! their downstream closure while preserving everything else.

use crate::errors::DevflowError;
use crate::registry::StageRegistry;
use crate::store::RunState;
use std::collections::BTreeSet;

/// A new user request layered onto an existing project.
#[derive(Debug, Clone, Default)]
pub struct ResumeRequest {
    /// What the user asked for.
    pub description: String,
    /// Stage ids the caller judged to be impacted by the request.
    pub impacted_stages: BTreeSet<String>,
    /// Whether to re-run complexity classification for the increment.
    pub reclassify: bool,
}

impl ResumeRequest {
    /// Creates a resume request impacting the given stages.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        impacted_stages: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            description: description.into(),
            impacted_stages: impacted_stages.into_iter().map(Into::into).collect(),
            reclassify: false,
        }
    }

    /// Requests re-classification of the complexity tier.
    #[must_use]
    pub fn with_reclassify(mut self) -> Self {
        self.reclassify = true;
        self
    }
}

/// The minimal re-entry point into the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumePlan {
    /// Re-enter the dispatcher with `reset` stages returned to pending;
    /// all other completed stages are honored as-is.
    AppendIncrement {
        /// Stages to reset: the impacted set plus its downstream closure.
        reset: BTreeSet<String>,
    },
    /// The request requires no stage re-execution.
    NoOp,
}

/// Plans and applies resume requests against run state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResumeController;

impl ResumeController {
    /// Creates a controller.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Computes the resume plan for a request.
    ///
    /// The reset set is the union of each impacted stage with its
    /// transitive dependents. Impacted stages that never completed (and
    /// have no completed dependents) still re-run on the next drive, so
    /// they produce a plan too; a request impacting nothing is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if an impacted stage id is not declared in the
    /// registry.
    pub fn plan(
        &self,
        registry: &StageRegistry,
        request: &ResumeRequest,
    ) -> Result<ResumePlan, DevflowError> {
        if request.impacted_stages.is_empty() {
            return Ok(ResumePlan::NoOp);
        }

        let mut reset = BTreeSet::new();
        for stage in &request.impacted_stages {
            if !registry.contains(stage) {
                return Err(DevflowError::Internal(format!(
                    "resume request names unknown stage '{stage}'"
                )));
            }
            reset.insert(stage.clone());
            reset.extend(registry.downstream_closure(stage));
        }

        Ok(ResumePlan::AppendIncrement { reset })
    }

    /// Applies a plan to run state: resets the planned stages and records
    /// the pending increment.
    pub fn apply(&self, state: &mut RunState, request: &ResumeRequest, plan: &ResumePlan) {
        if let ResumePlan::AppendIncrement { reset } = plan {
            state.reset_stages(reset);
        }
        if !request.description.trim().is_empty() {
            state.pending_increment = Some(request.description.clone());
        }
    }
}

//! The dispatcher: the stage-sequencing engine.
//!
//! Walks the stage registry in a topological order computed once,
//! invokes workers serially (the worker boundary has file side effects,
//! so one stage at a time per project), validates returned envelopes,
//! and records completed stages durably before advancing. A failed stage
//! poisons only its downstream closure; unrelated branches keep running.

mod bundle;


pub use bundle::InputBundle;

use crate::cancellation::CancellationToken;
use crate::contracts::ContractRegistry;
use crate::core::{RunStatus, StageState};
use crate::errors::{DevflowError, WorkerError};
use crate::events::{EventSink, NoOpEventSink};
use crate::registry::StageRegistry;
use crate::store::{RunState, RunStateStore, StageRecord};
use crate::validate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A stage that failed during a drive, with its reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    /// The failed stage id.
    pub stage: String,
    /// The validation or worker error, rendered.
    pub error: String,
}

/// The result of driving a run as far as it will go.
#[derive(Debug, Clone)]
pub struct DriveOutcome {
    /// Terminal status of the drive.
    pub status: RunStatus,
    /// Stages that failed, in failure order.
    pub failures: Vec<StageFailure>,
    /// Stages executed to completion during this drive.
    pub executed: Vec<String>,
}

impl DriveOutcome {
    /// The first failed stage, if the run halted.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StageFailure> {
        self.failures.first()
    }
}

/// Drives a single project's stages to completion or halt.
///
/// Exclusively owns the project's run state while driving; the stage and
/// contract registries are shared read-only across dispatchers.
pub struct Dispatcher {
    registry: Arc<StageRegistry>,
    contracts: Arc<ContractRegistry>,
    store: Arc<dyn RunStateStore>,
    events: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given registries and store.
    #[must_use]
    pub fn new(
        registry: Arc<StageRegistry>,
        contracts: Arc<ContractRegistry>,
        store: Arc<dyn RunStateStore>,
    ) -> Self {
        Self {
            registry,
            contracts,
            store,
            events: Arc::new(NoOpEventSink),
            cancel: Arc::new(CancellationToken::new()),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: Arc<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drives every runnable stage of `state` in one linear pass.
    ///
    /// Stages already recorded as completed are honored as-is, which makes
    /// re-driving the same state idempotent. Each completed stage is
    /// durably appended before the in-memory state advances; a store
    /// failure aborts the drive with the stage still not-completed and
    /// safely retryable.
    ///
    /// # Errors
    ///
    /// Returns `DevflowError::Internal` if no complexity tier has been
    /// established, or `DevflowError::Store` if a durable append fails.
    /// Stage-level worker and validation failures are not errors: they
    /// are recorded in the outcome and halt only the dependent subgraph.
    pub async fn drive(&self, state: &mut RunState) -> Result<DriveOutcome, DevflowError> {
        let tier = state.complexity_tier.ok_or_else(|| {
            DevflowError::Internal(format!(
                "project '{}' has no complexity tier; classify before dispatch",
                state.project_id
            ))
        })?;
        let request = state.effective_request().to_string();

        let mut stage_states: HashMap<String, StageState> = self
            .registry
            .ids()
            .map(|id| {
                let s = if state.is_completed(id) {
                    StageState::Completed
                } else {
                    StageState::Pending
                };
                (id.to_string(), s)
            })
            .collect();

        let mut failures = Vec::new();
        let mut executed = Vec::new();

        for stage_id in self.registry.topo_order() {
            if stage_states.get(stage_id) == Some(&StageState::Completed) {
                continue;
            }

            if self.cancel.is_cancelled() {
                let reason = self.cancel.reason().unwrap_or_default();
                warn!(project = %state.project_id, %reason, "run cancelled between stages");
                self.events.try_emit(
                    "run.cancelled",
                    Some(serde_json::json!({
                        "project": state.project_id,
                        "reason": reason,
                    })),
                );
                return Ok(DriveOutcome {
                    status: RunStatus::InProgress,
                    failures,
                    executed,
                });
            }

            let Some(requires) = self.registry.requires(stage_id) else {
                continue;
            };
            let eligible = requires
                .iter()
                .all(|dep| stage_states.get(dep) == Some(&StageState::Completed));
            if !eligible {
                // A predecessor failed or is itself blocked; stays pending.
                continue;
            }

            stage_states.insert(stage_id.clone(), StageState::Eligible);
            self.events.try_emit(
                "stage.eligible",
                Some(serde_json::json!({"stage": stage_id})),
            );

            let mut input = InputBundle::new(stage_id.clone(), tier, request.clone());
            for dep in requires {
                if let Some(envelope) = state.envelope_of(dep) {
                    input.absorb(dep, envelope, &self.contracts);
                }
            }

            stage_states.insert(stage_id.clone(), StageState::Running);
            self.events.try_emit(
                "stage.started",
                Some(serde_json::json!({"stage": stage_id})),
            );
            info!(project = %state.project_id, stage = %stage_id, tier = %tier, "invoking stage worker");

            match self.invoke(stage_id, &input).await {
                Ok(record) => {
                    // Durable append before the in-memory state advances.
                    self.store.append(&state.project_id, record.clone())?;
                    state.record(record);
                    stage_states.insert(stage_id.clone(), StageState::Completed);
                    executed.push(stage_id.clone());
                    self.events.try_emit(
                        "stage.completed",
                        Some(serde_json::json!({"stage": stage_id})),
                    );
                }
                Err(error) => {
                    let rendered = error.to_string();
                    warn!(project = %state.project_id, stage = %stage_id, error = %rendered, "stage failed");
                    stage_states.insert(stage_id.clone(), StageState::Failed);
                    self.events.try_emit(
                        "stage.failed",
                        Some(serde_json::json!({
                            "stage": stage_id,
                            "error": rendered,
                        })),
                    );
                    failures.push(StageFailure {
                        stage: stage_id.clone(),
                        error: rendered,
                    });
                }
            }
        }

        let all_completed = stage_states
            .values()
            .all(|s| *s == StageState::Completed);

        let status = if all_completed {
            self.events.try_emit(
                "run.completed",
                Some(serde_json::json!({"project": state.project_id})),
            );
            RunStatus::Completed
        } else if failures.is_empty() {
            RunStatus::InProgress
        } else {
            self.events.try_emit(
                "run.halted",
                Some(serde_json::json!({
                    "project": state.project_id,
                    "failed_stage": failures[0].stage,
                })),
            );
            RunStatus::Halted
        };

        Ok(DriveOutcome {
            status,
            failures,
            executed,
        })
    }

    /// Invokes one stage worker and validates its envelope.
    async fn invoke(
        &self,
        stage_id: &str,
        input: &InputBundle,
    ) -> Result<StageRecord, DevflowError> {
        let worker = self.registry.worker(stage_id).ok_or_else(|| {
            DevflowError::Internal(format!("no worker registered for stage '{stage_id}'"))
        })?;

        let raw = worker.run(input).await.map_err(DevflowError::Worker)?;
        let valid = validate::validate(&raw, stage_id, &self.registry, &self.contracts)
            .map_err(DevflowError::Validation)?;

        if !valid.is_completed() {
            let reason = valid
                .error
                .clone()
                .unwrap_or_else(|| "worker reported failure".to_string());
            return Err(DevflowError::Worker(WorkerError::failed(stage_id, reason)));
        }

        Ok(StageRecord::new(stage_id, valid.into_inner()))
    }
}

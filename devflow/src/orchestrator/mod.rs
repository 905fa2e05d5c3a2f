//! The control surface over the orchestration core.
//!
//! `start` classifies then drives a new project; `resume` loads persisted
//! state, applies the resume plan, and re-drives; `inspect` is a
//! read-only snapshot. One orchestrator instance serves many projects;
//! each drive exclusively owns its project's run state.

#[cfg(test)]
mod integration_tests;

use crate::cancellation::CancellationToken;
use crate::classify::{ComplexityClassifier, KeywordClassifier};
use crate::contracts::ContractRegistry;
use crate::core::RunStatus;
use crate::dispatch::{Dispatcher, StageFailure};
use crate::errors::DevflowError;
use crate::events::{EventSink, NoOpEventSink};
use crate::registry::StageRegistry;
use crate::resume::{ResumeController, ResumePlan, ResumeRequest};
use crate::store::{RunState, RunStateStore};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// The terminal result of a `start` or `resume` drive.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The project's run state after the drive.
    pub state: RunState,
    /// Terminal status: completed, halted, or interrupted in-progress.
    pub status: RunStatus,
    /// When halted, the first failed stage and its error.
    pub failure: Option<StageFailure>,
}

impl RunReport {
    /// The failed stage id, when halted.
    #[must_use]
    pub fn halted_stage(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.stage.as_str())
    }
}

/// Drives projects through the declared stage graph.
pub struct Orchestrator {
    registry: Arc<StageRegistry>,
    contracts: Arc<ContractRegistry>,
    store: Arc<dyn RunStateStore>,
    classifier: Arc<dyn ComplexityClassifier>,
    events: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
    resume: ResumeController,
}

impl Orchestrator {
    /// Creates an orchestrator with the default keyword classifier and no
    /// event sink.
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
            classifier: Arc::new(KeywordClassifier::new()),
            events: Arc::new(NoOpEventSink),
            cancel: Arc::new(CancellationToken::new()),
            resume: ResumeController::new(),
        }
    }

    /// Sets the complexity classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ComplexityClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the cancellation token shared with running drives.
    #[must_use]
    pub fn cancellation(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancel)
    }

    /// Requests cancellation between stages.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.cancel.cancel(reason);
    }

    /// Starts a new project: classifies the request, persists the fresh
    /// run state, and drives the dispatcher to completion or halt.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the project id is taken, a
    /// `WorkerError` if classification fails, or a `StoreError` from a
    /// failed durable append mid-drive.
    pub async fn start(
        &self,
        project_id: &str,
        initial_request: &str,
    ) -> Result<RunReport, DevflowError> {
        let run_id = Uuid::new_v4();
        info!(project = %project_id, %run_id, "starting project");

        let mut state = RunState::new(project_id, initial_request);
        let tier = self.classifier.classify(initial_request).await?;
        state.complexity_tier = Some(tier);
        self.store.create(&state)?;

        self.events.try_emit(
            "run.started",
            Some(serde_json::json!({
                "project": project_id,
                "tier": tier.to_string(),
            })),
        );

        self.drive(state).await
    }

    /// Resumes an existing project with a new request.
    ///
    /// The caller supplies which stages the request impacts; the impacted
    /// stages and their downstream closure are reset, all other history
    /// is honored as-is, and the dispatcher re-drives from there. A
    /// previously-failed subgraph re-executes even when the impacted set
    /// is empty, because failed stages were never recorded as completed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for unknown projects, or the same
    /// classes of error as [`Orchestrator::start`].
    pub async fn resume(
        &self,
        project_id: &str,
        request: ResumeRequest,
    ) -> Result<RunReport, DevflowError> {
        let mut state = self.store.load(project_id)?;
        info!(project = %project_id, impacted = ?request.impacted_stages, "resuming project");

        if request.reclassify {
            let tier = self.classifier.classify(&request.description).await?;
            state.complexity_tier = Some(tier);
        }

        let plan = self.resume.plan(&self.registry, &request)?;
        self.resume.apply(&mut state, &request, &plan);
        self.store.replace(&state)?;

        self.events.try_emit(
            "run.resumed",
            Some(serde_json::json!({
                "project": project_id,
                "plan": match &plan {
                    ResumePlan::AppendIncrement { reset } => {
                        serde_json::json!({"reset": reset.iter().collect::<Vec<_>>()})
                    }
                    ResumePlan::NoOp => serde_json::json!("noop"),
                },
            })),
        );

        self.drive(state).await
    }

    /// Returns a read-only snapshot of a project's run state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for unknown projects.
    pub fn inspect(&self, project_id: &str) -> Result<RunState, DevflowError> {
        Ok(self.store.snapshot(project_id)?)
    }

    /// Lists known project ids.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the store cannot be enumerated.
    pub fn projects(&self) -> Result<Vec<String>, DevflowError> {
        Ok(self.store.list()?)
    }

    /// Deletes a project's run state. Explicit deletion only.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for unknown projects.
    pub fn delete(&self, project_id: &str) -> Result<(), DevflowError> {
        Ok(self.store.delete(project_id)?)
    }

    async fn drive(&self, mut state: RunState) -> Result<RunReport, DevflowError> {
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.contracts),
            Arc::clone(&self.store),
        )
        .with_events(Arc::clone(&self.events))
        .with_cancellation(Arc::clone(&self.cancel));

        let outcome = dispatcher.drive(&mut state).await?;

        // A serviced increment is folded into history once the run is whole.
        if outcome.status == RunStatus::Completed && state.pending_increment.is_some() {
            state.pending_increment = None;
            self.store.replace(&state)?;
        }

        Ok(RunReport {
            failure: outcome.first_failure().cloned(),
            status: outcome.status,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FixedClassifier;
    use crate::core::ComplexityTier;
    use crate::errors::StoreError;
    use crate::store::MemoryStore;
    use crate::workers::{StaticWorker, Worker};
    use pretty_assertions::assert_eq;

    fn completed_worker(downstream: serde_json::Value) -> Arc<dyn Worker> {
        Arc::new(StaticWorker::new(serde_json::json!({
            "status": "completed",
            "summary": "done",
            "downstream_inputs": downstream,
        })))
    }

    fn fixtures() -> (Arc<StageRegistry>, Arc<ContractRegistry>, Arc<MemoryStore>) {
        let contracts = Arc::new(
            ContractRegistry::new().require("requirements", "architecture", ["requirements"]),
        );
        let registry = Arc::new(
            StageRegistry::builder()
                .stage(
                    "requirements",
                    completed_worker(serde_json::json!({
                        "architecture": {"requirements": "an ordering flow"}
                    })),
                    &[],
                )
                .unwrap()
                .stage(
                    "architecture",
                    completed_worker(serde_json::json!({})),
                    &["requirements"],
                )
                .unwrap()
                .build(&contracts)
                .unwrap(),
        );
        let store = Arc::new(MemoryStore::new());
        (registry, contracts, store)
    }

    fn orchestrator(
        registry: &Arc<StageRegistry>,
        contracts: &Arc<ContractRegistry>,
        store: &Arc<MemoryStore>,
    ) -> Orchestrator {
        Orchestrator::new(
            Arc::clone(registry),
            Arc::clone(contracts),
            Arc::clone(store) as Arc<dyn RunStateStore>,
        )
    }

    #[tokio::test]
    async fn test_start_classifies_and_completes() {
        let (registry, contracts, store) = fixtures();
        let orch = orchestrator(&registry, &contracts, &store)
            .with_classifier(Arc::new(FixedClassifier(ComplexityTier::Moderate)));

        let report = orch.start("p1", "a web application").await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.state.complexity_tier, Some(ComplexityTier::Moderate));
        assert!(report.failure.is_none());
        assert_eq!(report.state.completed_stages.len(), 2);
    }

    #[tokio::test]
    async fn test_start_twice_conflicts() {
        let (registry, contracts, store) = fixtures();
        let orch = orchestrator(&registry, &contracts, &store);

        orch.start("p1", "something").await.unwrap();
        let err = orch.start("p1", "something else").await.unwrap_err();

        assert!(matches!(
            err,
            DevflowError::Store(StoreError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_inspect_is_read_only_snapshot() {
        let (registry, contracts, store) = fixtures();
        let orch = orchestrator(&registry, &contracts, &store);

        orch.start("p1", "something").await.unwrap();
        let snapshot = orch.inspect("p1").unwrap();
        assert_eq!(snapshot.completed_stages.len(), 2);

        assert!(matches!(
            orch.inspect("missing"),
            Err(DevflowError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_resume_resets_impacted_closure_and_redrives() {
        let (registry, contracts, store) = fixtures();
        let orch = orchestrator(&registry, &contracts, &store);

        orch.start("p1", "something").await.unwrap();

        let report = orch
            .resume("p1", ResumeRequest::new("tighten requirements", ["requirements"]))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        // Both stages re-ran and the increment was folded away.
        assert_eq!(report.state.completed_stages.len(), 2);
        assert!(report.state.pending_increment.is_none());
    }

    #[tokio::test]
    async fn test_resume_reuses_stored_tier() {
        let (registry, contracts, store) = fixtures();
        let orch = orchestrator(&registry, &contracts, &store)
            .with_classifier(Arc::new(FixedClassifier(ComplexityTier::Complex)));

        orch.start("p1", "a platform").await.unwrap();

        // Swap in an orchestrator whose classifier would disagree.
        let orch = orchestrator(&registry, &contracts, &store)
            .with_classifier(Arc::new(FixedClassifier(ComplexityTier::Simple)));

        let report = orch
            .resume("p1", ResumeRequest::new("small tweak", ["architecture"]))
            .await
            .unwrap();
        assert_eq!(report.state.complexity_tier, Some(ComplexityTier::Complex));

        let report = orch
            .resume(
                "p1",
                ResumeRequest::new("rescope the whole thing", ["requirements"]).with_reclassify(),
            )
            .await
            .unwrap();
        assert_eq!(report.state.complexity_tier, Some(ComplexityTier::Simple));
    }

    #[tokio::test]
    async fn test_resume_unknown_project() {
        let (registry, contracts, store) = fixtures();
        let orch = orchestrator(&registry, &contracts, &store);

        let err = orch
            .resume("missing", ResumeRequest::new("anything", ["requirements"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DevflowError::Store(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let (registry, contracts, store) = fixtures();
        let orch = orchestrator(&registry, &contracts, &store);

        orch.start("p1", "something").await.unwrap();
        orch.start("p2", "something").await.unwrap();

        assert_eq!(orch.projects().unwrap(), vec!["p1", "p2"]);
        orch.delete("p1").unwrap();
        assert_eq!(orch.projects().unwrap(), vec!["p2"]);
    }
}

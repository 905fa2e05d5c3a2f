//! Stage registry: the declared stage graph and its workers.
//!
//! Stages are declared once at startup and immutable thereafter. All graph
//! validation happens while the registry is built, before any project
//! runs: unknown predecessor references, cycles, duplicate declarations,
//! and duplicate contract field exposure are configuration errors, never
//! runtime concerns.

use crate::contracts::ContractRegistry;
use crate::errors::ConfigurationError;
use crate::workers::Worker;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Declaration of a single pipeline stage.
#[derive(Debug, Clone)]
pub struct StageDecl {
    /// Stable symbolic id.
    pub id: String,
    /// Stage ids that must complete before this stage may run.
    pub requires: BTreeSet<String>,
    /// The worker capable of executing the stage.
    pub worker: Arc<dyn Worker>,
}

/// Builder for a validated stage registry.
#[derive(Debug, Default)]
pub struct StageRegistryBuilder {
    stages: Vec<StageDecl>,
    ids: HashSet<String>,
}

impl StageRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a stage with its predecessors.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the id is already declared, the
    /// stage requires itself, or a predecessor has not been declared yet
    /// (predecessors must be declared before their dependents).
    pub fn stage(
        mut self,
        id: impl Into<String>,
        worker: Arc<dyn Worker>,
        requires: &[&str],
    ) -> Result<Self, ConfigurationError> {
        let id = id.into();

        if !self.ids.insert(id.clone()) {
            return Err(ConfigurationError::DuplicateStage { stage: id });
        }

        let mut deps = BTreeSet::new();
        for dep in requires {
            if *dep == id {
                return Err(ConfigurationError::CycleDetected {
                    path: vec![id.clone(), id],
                });
            }
            if !self.ids.contains(*dep) {
                return Err(ConfigurationError::UnknownDependency {
                    stage: id,
                    dependency: (*dep).to_string(),
                });
            }
            deps.insert((*dep).to_string());
        }

        self.stages.push(StageDecl {
            id,
            requires: deps,
            worker,
        });
        Ok(self)
    }

    /// Validates the graph against the contract table and builds the
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the registry is empty, the
    /// requires-graph contains a cycle, or two predecessors of one
    /// consumer expose the same contract field.
    pub fn build(self, contracts: &ContractRegistry) -> Result<StageRegistry, ConfigurationError> {
        if self.stages.is_empty() {
            return Err(ConfigurationError::EmptyRegistry);
        }

        let by_id: HashMap<String, usize> = self
            .stages
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        detect_cycles(&self.stages, &by_id)?;
        detect_duplicate_exposure(&self.stages, contracts)?;

        let topo_order = topological_order(&self.stages, &by_id);

        Ok(StageRegistry {
            stages: self.stages,
            by_id,
            topo_order,
        })
    }
}

/// The validated, immutable stage graph.
///
/// Read-only after construction; freely shared across concurrent project
/// dispatchers.
#[derive(Debug)]
pub struct StageRegistry {
    stages: Vec<StageDecl>,
    by_id: HashMap<String, usize>,
    topo_order: Vec<String>,
}

impl StageRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> StageRegistryBuilder {
        StageRegistryBuilder::new()
    }

    /// Returns stage ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.id.as_str())
    }

    /// Returns the execution order: topological, with independent stages
    /// kept in declaration order.
    #[must_use]
    pub fn topo_order(&self) -> &[String] {
        &self.topo_order
    }

    /// Returns the number of declared stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stages are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns true if the stage id is declared.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Returns the predecessors of a stage.
    #[must_use]
    pub fn requires(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.by_id.get(id).map(|&i| &self.stages[i].requires)
    }

    /// Returns the worker declared for a stage.
    #[must_use]
    pub fn worker(&self, id: &str) -> Option<Arc<dyn Worker>> {
        self.by_id.get(id).map(|&i| Arc::clone(&self.stages[i].worker))
    }

    /// Returns every stage that transitively requires `id`.
    ///
    /// The result excludes `id` itself.
    #[must_use]
    pub fn downstream_closure(&self, id: &str) -> BTreeSet<String> {
        let mut closure = BTreeSet::new();
        let mut frontier = vec![id.to_string()];

        while let Some(current) = frontier.pop() {
            for stage in &self.stages {
                if stage.requires.contains(&current) && closure.insert(stage.id.clone()) {
                    frontier.push(stage.id.clone());
                }
            }
        }

        closure
    }
}

fn detect_cycles(
    stages: &[StageDecl],
    by_id: &HashMap<String, usize>,
) -> Result<(), ConfigurationError> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for stage in stages {
        if !visited.contains(&stage.id) {
            if let Some(cycle) =
                dfs_cycle(&stage.id, stages, by_id, &mut visited, &mut rec_stack, &mut path)
            {
                return Err(ConfigurationError::CycleDetected { path: cycle });
            }
        }
    }

    Ok(())
}

fn dfs_cycle(
    node: &str,
    stages: &[StageDecl],
    by_id: &HashMap<String, usize>,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(&i) = by_id.get(node) {
        for dep in &stages[i].requires {
            if !visited.contains(dep) {
                if let Some(cycle) = dfs_cycle(dep, stages, by_id, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(dep) {
                let start = path.iter().position(|n| n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].to_vec();
                cycle.push(dep.clone());
                return Some(cycle);
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}

fn detect_duplicate_exposure(
    stages: &[StageDecl],
    contracts: &ContractRegistry,
) -> Result<(), ConfigurationError> {
    for consumer in stages {
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for producer in &consumer.requires {
            for field in contracts.fields_required_by(producer, &consumer.id) {
                if let Some(previous) = seen.insert(field.as_str(), producer.as_str()) {
                    return Err(ConfigurationError::DuplicateFieldExposure {
                        consumer: consumer.id.clone(),
                        field: field.clone(),
                        producers: vec![previous.to_string(), producer.clone()],
                    });
                }
            }
        }
    }
    Ok(())
}

fn topological_order(stages: &[StageDecl], by_id: &HashMap<String, usize>) -> Vec<String> {
    let mut result = Vec::new();
    let mut visited = HashSet::new();

    fn visit(
        node: &str,
        stages: &[StageDecl],
        by_id: &HashMap<String, usize>,
        visited: &mut HashSet<String>,
        result: &mut Vec<String>,
    ) {
        if visited.contains(node) {
            return;
        }
        visited.insert(node.to_string());

        if let Some(&i) = by_id.get(node) {
            for dep in &stages[i].requires {
                visit(dep, stages, by_id, visited, result);
            }
        }

        result.push(node.to_string());
    }

    // Visit in declaration order so independent stages keep it.
    for stage in stages {
        visit(&stage.id, stages, by_id, &mut visited, &mut result);
    }

    result
}

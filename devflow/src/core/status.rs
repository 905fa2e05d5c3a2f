//! Status enums for envelopes, stages, and whole runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status a worker reports in its envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    /// The worker finished its stage successfully.
    Completed,
    /// The worker could not finish its stage.
    Failed,
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl EnvelopeStatus {
    /// Parses a wire-format status string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// The scheduling state of a stage within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Waiting on at least one predecessor.
    Pending,
    /// All predecessors completed; may be started.
    Eligible,
    /// Worker invocation in flight.
    Running,
    /// Envelope validated and durably recorded.
    Completed,
    /// Worker failed or its envelope was rejected.
    Failed,
}

impl Default for StageState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Eligible => write!(f, "eligible"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageState {
    /// Returns true if the state is terminal for this run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The overall status of a project run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Stages remain and none has failed, or the run was interrupted.
    InProgress,
    /// Every declared stage completed.
    Completed,
    /// No eligible stage remains and at least one stage failed.
    Halted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Halted => write!(f, "halted"),
        }
    }
}

//! The envelope: the result contract every worker returns.

use super::EnvelopeStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field values a producer exposes to one downstream consumer.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// Mapping from consumer stage id to the fields exposed to it.
pub type DownstreamInputs = BTreeMap<String, FieldMap>;

/// Describes one artifact a worker generated.
///
/// Order of artifacts within an envelope is insertion order; the core
/// preserves it but attaches no meaning to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Project-relative path of the artifact.
    pub path: String,

    /// Display name of the artifact.
    pub name: String,

    /// What the artifact contains.
    #[serde(default)]
    pub description: String,

    /// Salient points a reader should take from the artifact.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
}

impl ArtifactDescriptor {
    /// Creates a new artifact descriptor.
    #[must_use]
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            description: String::new(),
            key_points: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a key point.
    #[must_use]
    pub fn with_key_point(mut self, point: impl Into<String>) -> Self {
        self.key_points.push(point.into());
        self
    }
}

/// The structured result a worker returns for one stage invocation.
///
/// The dispatcher interprets only `status` and `downstream_inputs`;
/// everything else is opaque payload carried for the project record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the worker finished its stage.
    pub status: EnvelopeStatus,

    /// Opaque summary text.
    #[serde(default)]
    pub summary: String,

    /// Artifacts the worker generated, in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated_artifacts: Vec<ArtifactDescriptor>,

    /// Named fields exposed to downstream consumer stages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub downstream_inputs: DownstreamInputs,

    /// Failure detail (for failed envelopes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Creates a completed envelope with a summary.
    #[must_use]
    pub fn completed(summary: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Completed,
            summary: summary.into(),
            generated_artifacts: Vec::new(),
            downstream_inputs: BTreeMap::new(),
            error: None,
        }
    }

    /// Creates a failed envelope with an error message.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Failed,
            summary: String::new(),
            generated_artifacts: Vec::new(),
            downstream_inputs: BTreeMap::new(),
            error: Some(error.into()),
        }
    }

    /// Adds artifacts to the envelope.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<ArtifactDescriptor>) -> Self {
        self.generated_artifacts = artifacts;
        self
    }

    /// Appends one artifact.
    #[must_use]
    pub fn add_artifact(mut self, artifact: ArtifactDescriptor) -> Self {
        self.generated_artifacts.push(artifact);
        self
    }

    /// Exposes a field value to a downstream consumer.
    #[must_use]
    pub fn expose(
        mut self,
        consumer: impl Into<String>,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.downstream_inputs
            .entry(consumer.into())
            .or_default()
            .insert(field.into(), value);
        self
    }

    /// Returns true if the worker completed its stage.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == EnvelopeStatus::Completed
    }

    /// Returns the fields exposed to a consumer, if any.
    #[must_use]
    pub fn inputs_for(&self, consumer: &str) -> Option<&FieldMap> {
        self.downstream_inputs.get(consumer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_envelope() {
        let env = Envelope::completed("requirements analyzed");
        assert!(env.is_completed());
        assert_eq!(env.summary, "requirements analyzed");
        assert!(env.error.is_none());
    }

    #[test]
    fn test_failed_envelope() {
        let env = Envelope::failed("model unavailable");
        assert!(!env.is_completed());
        assert_eq!(env.error, Some("model unavailable".to_string()));
    }

    #[test]
    fn test_expose_groups_by_consumer() {
        let env = Envelope::completed("done")
            .expose("architecture", "requirements", serde_json::json!("low-latency API"))
            .expose("architecture", "security_requirements", serde_json::json!("none"))
            .expose("design", "user_requirements", serde_json::json!("two screens"));

        assert_eq!(env.inputs_for("architecture").map(BTreeMap::len), Some(2));
        assert_eq!(env.inputs_for("design").map(BTreeMap::len), Some(1));
        assert!(env.inputs_for("testing").is_none());
    }

    #[test]
    fn test_artifact_order_preserved() {
        let env = Envelope::completed("done")
            .add_artifact(ArtifactDescriptor::new("docs/a.md", "a.md"))
            .add_artifact(ArtifactDescriptor::new("docs/b.md", "b.md"));

        let names: Vec<_> = env.generated_artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_artifact_builder() {
        let artifact = ArtifactDescriptor::new("docs/spec.md", "spec.md")
            .with_description("functional specification")
            .with_key_point("three user roles");

        assert_eq!(artifact.description, "functional specification");
        assert_eq!(artifact.key_points.len(), 1);
    }

    #[test]
    fn test_envelope_serialization_roundtrip() {
        let env = Envelope::completed("ok")
            .add_artifact(ArtifactDescriptor::new("src/main.rs", "main.rs"))
            .expose("review", "source_code_files", serde_json::json!(["src/main.rs"]));

        let json = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();

        assert_eq!(back.status, env.status);
        assert_eq!(back.generated_artifacts.len(), 1);
        assert!(back.inputs_for("review").is_some());
    }

    #[test]
    fn test_failed_envelope_serializes_error() {
        let json = serde_json::to_string(&Envelope::failed("boom")).unwrap();
        assert!(json.contains(r#""error":"boom""#));
    }
}

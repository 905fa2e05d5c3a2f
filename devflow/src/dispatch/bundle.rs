//! Input bundle assembly for worker invocations.

use crate::contracts::ContractRegistry;
use crate::core::{ComplexityTier, Envelope, FieldMap};
use serde::{Deserialize, Serialize};

/// The assembled argument for one worker invocation.
///
/// The union, over the stage's predecessors, of the fields each
/// predecessor's envelope exposes to this consumer per the contract
/// registry, plus the complexity tier and the driving request text.
/// Ephemeral: reconstructible from run state and contracts at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBundle {
    /// The stage being invoked.
    pub stage: String,

    /// The project's complexity tier, injected into every bundle.
    pub complexity_tier: ComplexityTier,

    /// The request driving this run (initial request or pending increment).
    pub request: String,

    /// Contract-filtered fields collected from predecessor envelopes.
    #[serde(default)]
    pub fields: FieldMap,
}

impl InputBundle {
    /// Creates an empty bundle for a stage.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        complexity_tier: ComplexityTier,
        request: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            complexity_tier,
            request: request.into(),
            fields: FieldMap::new(),
        }
    }

    /// Merges the fields one predecessor exposes to this bundle's stage,
    /// filtered through the contract registry.
    ///
    /// Fields the producer exposes beyond its contract are dropped. The
    /// envelope validator has already rejected envelopes with holes in
    /// their required fields, so every contract field is present here.
    pub fn absorb(&mut self, producer: &str, envelope: &Envelope, contracts: &ContractRegistry) {
        let required = contracts.fields_required_by(producer, &self.stage);
        if required.is_empty() {
            return;
        }
        if let Some(exposed) = envelope.inputs_for(&self.stage) {
            for field in required {
                if let Some(value) = exposed.get(field) {
                    self.fields.insert(field.clone(), value.clone());
                }
            }
        }
    }

    /// Gets a field value by name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }

    /// Gets a field as a string slice, if it is a string.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Envelope;

    fn contracts() -> ContractRegistry {
        ContractRegistry::new()
            .require("requirements", "architecture", ["requirements", "performance_requirements"])
            .require("design", "architecture", ["ui_constraints"])
    }

    #[test]
    fn test_absorb_filters_through_contract() {
        let envelope = Envelope::completed("done")
            .expose("architecture", "requirements", serde_json::json!("rest api"))
            .expose("architecture", "performance_requirements", serde_json::json!("low-latency"))
            .expose("architecture", "extra_field", serde_json::json!("dropped"));

        let mut bundle = InputBundle::new("architecture", ComplexityTier::Simple, "build it");
        bundle.absorb("requirements", &envelope, &contracts());

        assert_eq!(bundle.get_str("requirements"), Some("rest api"));
        assert_eq!(bundle.get_str("performance_requirements"), Some("low-latency"));
        assert!(bundle.get("extra_field").is_none());
    }

    #[test]
    fn test_absorb_union_over_predecessors() {
        let req = Envelope::completed("done")
            .expose("architecture", "requirements", serde_json::json!("orders"));
        let design = Envelope::completed("done")
            .expose("architecture", "ui_constraints", serde_json::json!("mobile-first"));

        let mut bundle = InputBundle::new("architecture", ComplexityTier::Moderate, "build it");
        bundle.absorb("requirements", &req, &contracts());
        bundle.absorb("design", &design, &contracts());

        assert_eq!(bundle.fields.len(), 2);
    }

    #[test]
    fn test_absorb_no_contract_is_noop() {
        let envelope = Envelope::completed("done")
            .expose("architecture", "requirements", serde_json::json!("x"));

        let mut bundle = InputBundle::new("testing", ComplexityTier::Simple, "build it");
        bundle.absorb("requirements", &envelope, &contracts());

        assert!(bundle.fields.is_empty());
    }

    #[test]
    fn test_bundle_carries_tier_and_request() {
        let bundle = InputBundle::new("requirements", ComplexityTier::Complex, "build a platform");
        assert_eq!(bundle.complexity_tier, ComplexityTier::Complex);
        assert_eq!(bundle.request, "build a platform");
    }
}

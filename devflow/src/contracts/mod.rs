//! Contract registry: the static table of fields flowing between stages.
//!
//! Every data dependency between a producer and a consumer stage is
//! declared here, never discovered at runtime. A pair with no entry has no
//! data dependency beyond stage ordering.

use std::collections::{BTreeMap, BTreeSet};

/// Static table mapping `(producer, consumer)` to the field names the
/// consumer requires from the producer's `downstream_inputs`.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    entries: BTreeMap<(String, String), BTreeSet<String>>,
    empty: BTreeSet<String>,
}

impl ContractRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `consumer` requires `fields` from `producer`.
    ///
    /// Repeated calls for the same pair accumulate fields.
    #[must_use]
    pub fn require(
        mut self,
        producer: impl Into<String>,
        consumer: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let key = (producer.into(), consumer.into());
        self.entries
            .entry(key)
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Returns the fields `consumer` requires from `producer`.
    ///
    /// An unregistered pair returns the empty set: no data dependency.
    #[must_use]
    pub fn fields_required_by(&self, producer: &str, consumer: &str) -> &BTreeSet<String> {
        self.entries
            .get(&(producer.to_string(), consumer.to_string()))
            .unwrap_or(&self.empty)
    }

    /// Enumerates the consumers registered against `producer`, with the
    /// fields each requires.
    pub fn consumers_of<'a>(
        &'a self,
        producer: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a BTreeSet<String>)> {
        self.entries
            .iter()
            .filter(move |((p, _), _)| p == producer)
            .map(|((_, c), fields)| (c.as_str(), fields))
    }

    /// Returns the number of registered producer/consumer pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no contracts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContractRegistry {
        ContractRegistry::new()
            .require("requirements", "architecture", ["requirements", "security_requirements"])
            .require("requirements", "design", ["user_requirements"])
            .require("implementation", "review", ["source_code_files"])
    }

    #[test]
    fn test_fields_required_by_registered_pair() {
        let registry = sample();
        let fields = registry.fields_required_by("requirements", "architecture");
        assert_eq!(fields.len(), 2);
        assert!(fields.contains("security_requirements"));
    }

    #[test]
    fn test_unregistered_pair_is_empty() {
        let registry = sample();
        assert!(registry.fields_required_by("design", "review").is_empty());
        assert!(registry.fields_required_by("nope", "also_nope").is_empty());
    }

    #[test]
    fn test_consumers_of() {
        let registry = sample();
        let consumers: Vec<_> = registry.consumers_of("requirements").map(|(c, _)| c).collect();
        assert_eq!(consumers, vec!["architecture", "design"]);

        assert_eq!(registry.consumers_of("review").count(), 0);
    }

    #[test]
    fn test_repeated_require_accumulates() {
        let registry = ContractRegistry::new()
            .require("a", "b", ["x"])
            .require("a", "b", ["y"]);

        let fields = registry.fields_required_by("a", "b");
        assert!(fields.contains("x"));
        assert!(fields.contains("y"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ContractRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.fields_required_by("a", "b").is_empty());
    }
}

//! Complexity classification.
//!
//! Classification runs once, early, against the initial request. The
//! resulting tier is stored on the run state and injected into every
//! subsequent input bundle; a resumed run reuses the stored tier unless
//! the increment explicitly requests re-classification.

use crate::core::ComplexityTier;
use crate::errors::WorkerError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for the classification boundary component.
///
/// Treated as an external worker: implementations may call out to
/// anything, and must be safely re-runnable against the same request.
#[async_trait]
pub trait ComplexityClassifier: Send + Sync + Debug {
    /// Classifies the initial request into a complexity tier.
    ///
    /// # Errors
    ///
    /// Returns a `WorkerError` if the classification call itself fails.
    async fn classify(&self, request: &str) -> Result<ComplexityTier, WorkerError>;
}

const COMPLEX_KEYWORDS: &[&str] = &[
    "enterprise",
    "platform",
    "architecture",
    "microservices",
    "distributed",
    "scalable",
    "large-scale",
    "complex",
];

const MODERATE_KEYWORDS: &[&str] = &["application", "app", "system", "multiple", "integration"];

/// Keyword-based classifier.
///
/// Complex keywords are checked first, then moderate; anything else is
/// simple.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Creates a new keyword classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classifies synchronously.
    #[must_use]
    pub fn classify_text(request: &str) -> ComplexityTier {
        let request = request.to_lowercase();

        if COMPLEX_KEYWORDS.iter().any(|k| request.contains(k)) {
            return ComplexityTier::Complex;
        }
        if MODERATE_KEYWORDS.iter().any(|k| request.contains(k)) {
            return ComplexityTier::Moderate;
        }
        ComplexityTier::Simple
    }
}

#[async_trait]
impl ComplexityClassifier for KeywordClassifier {
    async fn classify(&self, request: &str) -> Result<ComplexityTier, WorkerError> {
        Ok(Self::classify_text(request))
    }
}

/// A classifier that always returns a fixed tier. For tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier(
    /// The tier returned for every request.
    pub ComplexityTier,
);

#[async_trait]
impl ComplexityClassifier for FixedClassifier {
    async fn classify(&self, _request: &str) -> Result<ComplexityTier, WorkerError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_by_default() {
        assert_eq!(
            KeywordClassifier::classify_text("convert unix timestamps to iso8601"),
            ComplexityTier::Simple
        );
    }

    #[test]
    fn test_moderate_keywords() {
        assert_eq!(
            KeywordClassifier::classify_text("Build a web application for a small restaurant"),
            ComplexityTier::Moderate
        );
    }

    #[test]
    fn test_complex_keywords_beat_moderate() {
        assert_eq!(
            KeywordClassifier::classify_text(
                "Build a scalable e-commerce application with microservices"
            ),
            ComplexityTier::Complex
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            KeywordClassifier::classify_text("An ENTERPRISE data PLATFORM"),
            ComplexityTier::Complex
        );
    }

    #[tokio::test]
    async fn test_classifier_trait() {
        let tier = KeywordClassifier::new().classify("a simple function").await.unwrap();
        assert_eq!(tier, ComplexityTier::Simple);

        let tier = FixedClassifier(ComplexityTier::Moderate)
            .classify("anything")
            .await
            .unwrap();
        assert_eq!(tier, ComplexityTier::Moderate);
    }
}

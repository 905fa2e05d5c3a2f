//! Complexity tier: the cross-cutting scaling signal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much depth of work each stage is asked for.
///
/// Classified once per project from the initial request and threaded
/// through every subsequent stage invocation. Immutable once set; a resumed
/// run reuses the stored tier unless re-classification is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplexityTier {
    /// Minimal documentation and essentials only.
    #[serde(rename = "SIMPLE")]
    Simple,
    /// More detailed deliverables and extra validation.
    #[serde(rename = "MODERATE")]
    Moderate,
    /// Full-depth deliverables across every stage.
    #[serde(rename = "COMPLEX")]
    Complex,
}

impl Default for ComplexityTier {
    fn default() -> Self {
        Self::Simple
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "SIMPLE"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Complex => write!(f, "COMPLEX"),
        }
    }
}

impl ComplexityTier {
    /// Parses the wire-format tier string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SIMPLE" => Some(Self::Simple),
            "MODERATE" => Some(Self::Moderate),
            "COMPLEX" => Some(Self::Complex),
            _ => None,
        }
    }
}

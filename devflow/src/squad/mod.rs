//! The default software-delivery pipeline.
//!
//! Six stages mirroring a delivery squad: requirements analysis,
//! architecture, UI design, implementation, code review, and testing.
//! The contract table declares exactly which fields flow along each edge;
//! nothing is inferred at runtime.

use crate::contracts::ContractRegistry;
use crate::errors::ConfigurationError;
use crate::registry::StageRegistry;
use crate::workers::Worker;
use std::sync::Arc;

/// Requirements analysis stage id.
pub const REQUIREMENTS: &str = "requirements";
/// Architecture stage id.
pub const ARCHITECTURE: &str = "architecture";
/// UI design stage id.
pub const DESIGN: &str = "design";
/// Implementation stage id.
pub const IMPLEMENTATION: &str = "implementation";
/// Code review stage id.
pub const REVIEW: &str = "review";
/// Testing stage id.
pub const TESTING: &str = "testing";

/// All squad stage ids in declaration order.
pub const STAGES: &[&str] = &[
    REQUIREMENTS,
    ARCHITECTURE,
    DESIGN,
    IMPLEMENTATION,
    REVIEW,
    TESTING,
];

/// The squad's contract table.
///
/// Each entry names the fields a consumer requires from a producer's
/// `downstream_inputs`. The complexity tier is deliberately absent: it is
/// injected into every bundle outside the contract mechanism.
#[must_use]
pub fn contracts() -> ContractRegistry {
    ContractRegistry::new()
        .require(
            REQUIREMENTS,
            ARCHITECTURE,
            [
                "requirements",
                "performance_requirements",
                "security_requirements",
                "integration_requirements",
                "scalability_requirements",
                "compliance_requirements",
            ],
        )
        .require(
            REQUIREMENTS,
            DESIGN,
            [
                "user_requirements",
                "user_personas",
                "accessibility_requirements",
                "content_structure",
            ],
        )
        .require(
            ARCHITECTURE,
            IMPLEMENTATION,
            [
                "technical_specifications",
                "architecture_guidelines",
                "technology_stack",
                "file_structure",
            ],
        )
        .require(DESIGN, IMPLEMENTATION, ["ui_specifications"])
        .require(
            IMPLEMENTATION,
            REVIEW,
            [
                "code_review_request",
                "source_code_files",
                "test_coverage_requirements",
            ],
        )
        .require(IMPLEMENTATION, TESTING, ["application_urls", "test_data"])
        .require(DESIGN, TESTING, ["test_scenarios", "accessibility_standards"])
}

/// Builds the squad stage registry, asking `worker_for` for the worker
/// bound to each stage id.
///
/// # Errors
///
/// Returns a `ConfigurationError` if the graph or contract table is
/// inconsistent (it is not, for the table shipped here, but custom
/// contract tables pass through the same validation).
pub fn registry<F>(
    contracts: &ContractRegistry,
    mut worker_for: F,
) -> Result<StageRegistry, ConfigurationError>
where
    F: FnMut(&str) -> Arc<dyn Worker>,
{
    StageRegistry::builder()
        .stage(REQUIREMENTS, worker_for(REQUIREMENTS), &[])?
        .stage(ARCHITECTURE, worker_for(ARCHITECTURE), &[REQUIREMENTS])?
        .stage(DESIGN, worker_for(DESIGN), &[REQUIREMENTS])?
        .stage(
            IMPLEMENTATION,
            worker_for(IMPLEMENTATION),
            &[ARCHITECTURE, DESIGN],
        )?
        .stage(REVIEW, worker_for(REVIEW), &[IMPLEMENTATION])?
        .stage(TESTING, worker_for(TESTING), &[IMPLEMENTATION, DESIGN])?
        .build(contracts)
}

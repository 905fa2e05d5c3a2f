//! Project identity and reporting helpers.
//!
//! Projects get a dated, request-derived identifier, and a run can be
//! rendered as a markdown progress report for the project record.

use crate::registry::StageRegistry;
use crate::store::{RunState, RunStateStore};
use chrono::Utc;
use regex::Regex;
use std::fmt::Write as _;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "were", "will", "with", "i", "want", "need",
    "can", "would", "like", "please", "help", "me", "my", "we", "us", "our",
];

const MAX_SLUG_LEN: usize = 50;

/// Derives a short slug from a free-form request.
///
/// Takes the first few meaningful words (stop words filtered), joined
/// with underscores and stripped to filesystem-safe characters. Falls
/// back to `project` when nothing meaningful remains.
#[must_use]
pub fn slug_from_request(request: &str) -> String {
    let word_re = Regex::new(r"[A-Za-z]+").expect("static pattern compiles");

    let lowered = request.to_lowercase();
    let words: Vec<&str> = word_re
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .take(4)
        .collect();

    let slug = if words.is_empty() {
        "project".to_string()
    } else {
        words.join("_")
    };

    let sanitize_re = Regex::new(r"[^\w\-]").expect("static pattern compiles");
    let mut slug = sanitize_re.replace_all(&slug, "").to_string();
    slug.truncate(MAX_SLUG_LEN);
    if slug.is_empty() {
        slug = "project".to_string();
    }
    slug
}

/// Builds a dated project id for a request: `project_YYYYMMDD_<slug>`.
#[must_use]
pub fn project_id_for(request: &str) -> String {
    let date = Utc::now().format("%Y%m%d");
    format!("project_{date}_{}", slug_from_request(request))
}

/// Builds a dated project id that is not yet taken in the store,
/// suffixing a counter when needed.
///
/// # Errors
///
/// Returns a `StoreError` if the store cannot be consulted.
pub fn unique_project_id(
    store: &dyn RunStateStore,
    request: &str,
) -> Result<String, crate::errors::StoreError> {
    let base = project_id_for(request);
    let taken = store.list()?;

    if !taken.contains(&base) {
        return Ok(base);
    }

    let mut counter = 1;
    loop {
        let candidate = format!("{base}_{counter}");
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Renders a markdown progress report for a run.
///
/// One section per declared stage, in execution order, with the stage's
/// summary and key deliverables once it has completed.
#[must_use]
pub fn progress_report(state: &RunState, registry: &StageRegistry) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}", state.project_id);
    let _ = writeln!(out);
    let _ = writeln!(out, "**Request:** {}", state.request);
    if let Some(tier) = state.complexity_tier {
        let _ = writeln!(out, "**Complexity:** {tier}");
    }
    if let Some(increment) = &state.pending_increment {
        let _ = writeln!(out, "**Pending increment:** {increment}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Stage Progress");
    let _ = writeln!(out);

    for stage in registry.topo_order() {
        match state.envelope_of(stage) {
            Some(envelope) => {
                let _ = writeln!(out, "### {stage} (completed)");
                let _ = writeln!(out);
                if !envelope.summary.is_empty() {
                    let _ = writeln!(out, "{}", envelope.summary);
                    let _ = writeln!(out);
                }

                let artifacts = &envelope.generated_artifacts;
                if !artifacts.is_empty() {
                    let _ = writeln!(out, "**Generated files:** {}", artifacts.len());
                    let names: Vec<&str> =
                        artifacts.iter().take(3).map(|a| a.name.as_str()).collect();
                    let mut line = format!("**Key deliverables:** {}", names.join(", "));
                    if artifacts.len() > 3 {
                        let _ = write!(line, " and {} more", artifacts.len() - 3);
                    }
                    let _ = writeln!(out, "{line}");
                    let _ = writeln!(out);
                }
            }
            None => {
                let _ = writeln!(out, "### {stage} (pending)");
                let _ = writeln!(out);
            }
        }
    }

    out
}

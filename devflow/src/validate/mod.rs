//! Envelope validation.
//!
//! Workers return raw JSON; nothing downstream runs until that record has
//! been checked against the envelope schema and the contract table. Holes
//! in required downstream fields are validation failures, never silent
//! gaps.

use crate::contracts::ContractRegistry;
use crate::core::{ArtifactDescriptor, DownstreamInputs, Envelope, EnvelopeStatus, FieldMap};
use crate::errors::ValidationError;
use crate::registry::StageRegistry;

/// An envelope that passed validation.
///
/// The only way to obtain one is through [`validate`], so holding a
/// `ValidEnvelope` certifies the downstream contract holds.
#[derive(Debug, Clone)]
pub struct ValidEnvelope(Envelope);

impl ValidEnvelope {
    /// Consumes the wrapper and returns the envelope.
    #[must_use]
    pub fn into_inner(self) -> Envelope {
        self.0
    }
}

impl std::ops::Deref for ValidEnvelope {
    type Target = Envelope;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Validates a worker's raw result for the given producer stage.
///
/// Checks the record parses as an envelope, the status is recognized,
/// and every artifact has a non-empty `path` and `name`. For completed
/// envelopes, every registered downstream consumer must receive its
/// required fields (present, non-null, non-empty for strings).
///
/// # Errors
///
/// Returns the first `ValidationError` encountered; errors carry the
/// offending stage id, artifact index, or consumer and field list.
pub fn validate(
    raw: &serde_json::Value,
    stage_id: &str,
    registry: &StageRegistry,
    contracts: &ContractRegistry,
) -> Result<ValidEnvelope, ValidationError> {
    let record = raw
        .as_object()
        .ok_or_else(|| ValidationError::MalformedEnvelope {
            stage: stage_id.to_string(),
            reason: "result is not a JSON object".to_string(),
        })?;

    let status_value =
        record
            .get("status")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ValidationError::MalformedEnvelope {
                stage: stage_id.to_string(),
                reason: "missing string field 'status'".to_string(),
            })?;

    let status =
        EnvelopeStatus::parse(status_value).ok_or_else(|| ValidationError::UnknownStatus {
            stage: stage_id.to_string(),
            value: status_value.to_string(),
        })?;

    let summary = record
        .get("summary")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();

    let error = record
        .get("error")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string);

    let generated_artifacts = parse_artifacts(record.get("generated_artifacts"), stage_id)?;
    let downstream_inputs = parse_downstream(record.get("downstream_inputs"), stage_id)?;

    let envelope = Envelope {
        status,
        summary,
        generated_artifacts,
        downstream_inputs,
        error,
    };

    if envelope.status == EnvelopeStatus::Completed {
        check_contracts(&envelope, stage_id, registry, contracts)?;
    }

    Ok(ValidEnvelope(envelope))
}

fn parse_artifacts(
    value: Option<&serde_json::Value>,
    stage_id: &str,
) -> Result<Vec<ArtifactDescriptor>, ValidationError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };

    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::MalformedEnvelope {
            stage: stage_id.to_string(),
            reason: "'generated_artifacts' is not an array".to_string(),
        })?;

    let mut artifacts = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let malformed = |reason: &str| ValidationError::MalformedArtifact {
            stage: stage_id.to_string(),
            index,
            reason: reason.to_string(),
        };

        let record = item.as_object().ok_or_else(|| malformed("not an object"))?;

        let path = record
            .get("path")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| malformed("missing string field 'path'"))?;
        if path.trim().is_empty() {
            return Err(malformed("empty 'path'"));
        }

        let name = record
            .get("name")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| malformed("missing string field 'name'"))?;
        if name.trim().is_empty() {
            return Err(malformed("empty 'name'"));
        }

        let description = record
            .get("description")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        let key_points = record
            .get("key_points")
            .and_then(serde_json::Value::as_array)
            .map(|points| {
                points
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        artifacts.push(ArtifactDescriptor {
            path: path.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            key_points,
        });
    }

    Ok(artifacts)
}

fn parse_downstream(
    value: Option<&serde_json::Value>,
    stage_id: &str,
) -> Result<DownstreamInputs, ValidationError> {
    let Some(value) = value else {
        return Ok(DownstreamInputs::new());
    };

    let record = value
        .as_object()
        .ok_or_else(|| ValidationError::MalformedEnvelope {
            stage: stage_id.to_string(),
            reason: "'downstream_inputs' is not an object".to_string(),
        })?;

    let mut inputs = DownstreamInputs::new();
    for (consumer, fields) in record {
        let fields = fields
            .as_object()
            .ok_or_else(|| ValidationError::MalformedEnvelope {
                stage: stage_id.to_string(),
                reason: format!("'downstream_inputs.{consumer}' is not an object"),
            })?;

        let map: FieldMap = fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        inputs.insert(consumer.clone(), map);
    }

    Ok(inputs)
}

fn check_contracts(
    envelope: &Envelope,
    stage_id: &str,
    registry: &StageRegistry,
    contracts: &ContractRegistry,
) -> Result<(), ValidationError> {
    for (consumer, required) in contracts.consumers_of(stage_id) {
        if !registry.contains(consumer) {
            continue;
        }

        let exposed = envelope.inputs_for(consumer);
        let missing: Vec<String> = required
            .iter()
            .filter(|field| !field_satisfied(exposed, field))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(ValidationError::MissingDownstreamFields {
                stage: stage_id.to_string(),
                consumer: consumer.to_string(),
                fields: missing,
            });
        }
    }

    Ok(())
}

fn field_satisfied(exposed: Option<&FieldMap>, field: &str) -> bool {
    match exposed.and_then(|map| map.get(field)) {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

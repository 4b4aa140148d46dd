//! Artifact flow validation.
//!
//! Every output artifact has exactly one producer, and every input artifact
//! was produced in a strictly earlier stage.

use stackpipe_core::artifact::ArtifactMap;
use stackpipe_core::pipeline::{ActionCategory, Stage};
use stackpipe_core::SynthError;
use std::collections::HashSet;
use tracing::debug;

/// Validate artifact production and consumption across `stages`.
pub fn validate_artifacts(stages: &[Stage]) -> Result<ArtifactMap, SynthError> {
    check_names(stages)?;

    let mut map = ArtifactMap::new();

    // Producers first, so consumption from a later stage reports ordering
    // rather than an unknown artifact.
    for (stage_index, stage) in stages.iter().enumerate() {
        for (action_ref, action) in stage.action_refs() {
            if action.category == ActionCategory::Source && !action.is_origin() {
                return Err(SynthError::InvalidSourceAction {
                    action: action_ref,
                    reason: format!(
                        "expected no input artifacts and exactly one output artifact, found {} input(s) and {} output(s)",
                        action.input_artifacts.len(),
                        action.output_artifacts.len()
                    ),
                });
            }

            for artifact in &action.output_artifacts {
                if let Some(existing) =
                    map.insert_producer(artifact, action_ref.clone(), stage_index)
                {
                    return Err(SynthError::DuplicateArtifact {
                        artifact: artifact.clone(),
                        first: existing.producer.clone(),
                        second: action_ref,
                    });
                }
            }
        }
    }

    for (stage_index, stage) in stages.iter().enumerate() {
        for (consumer, action) in stage.action_refs() {
            for artifact in &action.input_artifacts {
                let flow = map.get(artifact).ok_or_else(|| SynthError::UnknownArtifact {
                    artifact: artifact.clone(),
                    consumer: consumer.clone(),
                })?;

                if flow.stage_index == stage_index {
                    let producer_run_order = stage
                        .actions
                        .iter()
                        .find(|a| a.name == flow.producer.action)
                        .and_then(|a| a.run_order);
                    if producer_run_order == action.run_order {
                        return Err(SynthError::IntraWaveArtifactConflict {
                            artifact: artifact.clone(),
                            producer: flow.producer.clone(),
                            consumer,
                        });
                    }
                }

                if flow.stage_index >= stage_index {
                    return Err(SynthError::ArtifactOrdering {
                        artifact: artifact.clone(),
                        producer: flow.producer.clone(),
                        consumer,
                    });
                }

                debug!(artifact = %artifact, producer = %flow.producer, consumer = %consumer, "Artifact flow");
                map.add_consumer(artifact, consumer.clone());
            }
        }
    }

    Ok(map)
}

/// Stage names are unique per pipeline, action names unique per stage.
fn check_names(stages: &[Stage]) -> Result<(), SynthError> {
    let mut stage_names = HashSet::new();
    for stage in stages {
        if !stage_names.insert(stage.name.as_str()) {
            return Err(SynthError::DuplicateName {
                scope: "pipeline".to_string(),
                name: stage.name.clone(),
            });
        }

        let mut action_names = HashSet::new();
        for action in &stage.actions {
            if !action_names.insert(action.name.as_str()) {
                return Err(SynthError::DuplicateName {
                    scope: format!("stage '{}'", stage.name),
                    name: action.name.clone(),
                });
            }
        }
    }
    Ok(())
}

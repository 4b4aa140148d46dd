//! Stage and action ordering.
//!
//! Stages run in declaration order. Inside a stage, actions are grouped by
//! `runOrder` ascending; each group is a wave of concurrent actions.

use stackpipe_core::artifact::ArtifactMap;
use stackpipe_core::pipeline::Stage;
use stackpipe_core::plan::{ExecutionPlan, StagePlan, Wave};
use stackpipe_core::SynthError;
use std::collections::BTreeMap;
use tracing::debug;

/// Compute the wave plan for `stages` and check it against the artifact flow.
pub fn plan_execution(stages: &[Stage], artifacts: &ArtifactMap) -> Result<ExecutionPlan, SynthError> {
    let mut plan = ExecutionPlan::default();

    for stage in stages {
        let mut groups: BTreeMap<i64, Vec<_>> = BTreeMap::new();
        for (action_ref, action) in stage.action_refs() {
            match action.run_order {
                Some(run_order) if run_order > 0 => {
                    groups.entry(run_order).or_default().push(action_ref)
                }
                value => {
                    return Err(SynthError::InvalidRunOrder {
                        action: action_ref,
                        value,
                    });
                }
            }
        }

        let waves: Vec<Wave> = groups
            .into_iter()
            .map(|(run_order, actions)| Wave { run_order, actions })
            .collect();
        debug!(stage = %stage.name, waves = waves.len(), "Planned stage");

        plan.stages.push(StagePlan {
            name: stage.name.clone(),
            waves,
        });
    }

    check_flow(&plan, artifacts)?;
    Ok(plan)
}

/// Every consumer must sit in a strictly later wave than its producer.
fn check_flow(plan: &ExecutionPlan, artifacts: &ArtifactMap) -> Result<(), SynthError> {
    for (artifact, flow) in artifacts.iter() {
        let Some(produced_at) = plan.position(&flow.producer) else {
            continue;
        };
        for consumer in &flow.consumers {
            let Some(consumed_at) = plan.position(consumer) else {
                continue;
            };
            if produced_at == consumed_at {
                return Err(SynthError::IntraWaveArtifactConflict {
                    artifact: artifact.to_string(),
                    producer: flow.producer.clone(),
                    consumer: consumer.clone(),
                });
            }
            if produced_at > consumed_at {
                return Err(SynthError::ArtifactOrdering {
                    artifact: artifact.to_string(),
                    producer: flow.producer.clone(),
                    consumer: consumer.clone(),
                });
            }
        }
    }
    Ok(())
}

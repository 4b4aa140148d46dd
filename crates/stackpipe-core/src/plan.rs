//! Execution plan: stages of sequential waves of concurrent actions.

use serde::{Deserialize, Serialize};

use crate::id::ActionRef;

/// Actions sharing a run order inside one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wave {
    pub run_order: i64,
    /// Actions in declaration order.
    pub actions: Vec<ActionRef>,
}

/// The waves of one stage, in ascending run order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    pub name: String,
    pub waves: Vec<Wave>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionPlan {
    pub stages: Vec<StagePlan>,
}

impl ExecutionPlan {
    /// Waves across all stages in execution order.
    pub fn waves(&self) -> impl Iterator<Item = &Wave> {
        self.stages.iter().flat_map(|s| s.waves.iter())
    }

    /// Action names per wave, stage by stage.
    pub fn wave_names(&self) -> Vec<Vec<String>> {
        self.waves()
            .map(|w| w.actions.iter().map(|a| a.action.clone()).collect())
            .collect()
    }

    /// Position of an action as (stage index, wave index within the stage).
    pub fn position(&self, action: &ActionRef) -> Option<(usize, usize)> {
        self.stages.iter().enumerate().find_map(|(si, stage)| {
            stage
                .waves
                .iter()
                .position(|w| w.actions.contains(action))
                .map(|wi| (si, wi))
        })
    }
}

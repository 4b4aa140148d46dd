//! The synthesis result handed to a provisioning engine.

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::artifact::ArtifactMap;
use crate::id::ActionRef;
use crate::plan::ExecutionPlan;
use crate::resource::ResolvedResource;
use crate::stack::Provider;

/// Immutable output of one synthesis pass.
///
/// Serializes as the provisioning contract:
///
/// - `resolvedResources`: resources in dependency order
/// - `executionPlan`: `[{name, waves: [[ActionRef]], runOrders}]`
/// - `artifactMap`: artifact name to producing `ActionRef`
/// - `artifactConsumers`: artifact name to consuming `ActionRef`s
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub stack: String,
    pub providers: Vec<Provider>,
    /// Resources ordered so each appears after everything it references.
    pub resolved_resources: Vec<ResolvedResource>,
    pub execution_plan: ExecutionPlan,
    pub artifact_map: ArtifactMap,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Contract<'a> {
    stack: &'a str,
    providers: &'a [Provider],
    resolved_resources: &'a [ResolvedResource],
    execution_plan: Vec<ContractStage<'a>>,
    artifact_map: BTreeMap<&'a str, &'a ActionRef>,
    artifact_consumers: BTreeMap<&'a str, &'a [ActionRef]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContractStage<'a> {
    name: &'a str,
    waves: Vec<&'a [ActionRef]>,
    /// Run order of each wave, index-aligned with `waves`.
    run_orders: Vec<i64>,
}

impl Serialize for Synthesis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let execution_plan = self
            .execution_plan
            .stages
            .iter()
            .map(|stage| ContractStage {
                name: &stage.name,
                waves: stage.waves.iter().map(|w| w.actions.as_slice()).collect(),
                run_orders: stage.waves.iter().map(|w| w.run_order).collect(),
            })
            .collect();

        Contract {
            stack: &self.stack,
            providers: &self.providers,
            resolved_resources: &self.resolved_resources,
            execution_plan,
            artifact_map: self
                .artifact_map
                .iter()
                .map(|(name, flow)| (name, &flow.producer))
                .collect(),
            artifact_consumers: self
                .artifact_map
                .iter()
                .map(|(name, flow)| (name, flow.consumers.as_slice()))
                .collect(),
        }
        .serialize(serializer)
    }
}

impl Synthesis {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// SHA-256 of the compact JSON form, hex encoded.
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        let json = self.to_json()?;
        Ok(hex::encode(Sha256::digest(json.as_bytes())))
    }

    /// Copy with every sensitive value masked, for display.
    pub fn redacted(&self) -> Synthesis {
        let mut copy = self.clone();
        for resource in &mut copy.resolved_resources {
            for value in resource.attributes.values_mut() {
                *value = value.redacted();
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{StagePlan, Wave};
    use serde_json::json;

    fn two_stage() -> Synthesis {
        let checkout = ActionRef::new("Source", "Checkout");
        let compile = ActionRef::new("Build", "Compile");
        let mut artifact_map = ArtifactMap::new();
        artifact_map.insert_producer("src", checkout.clone(), 0);
        artifact_map.add_consumer("src", compile.clone());

        Synthesis {
            stack: "s".to_string(),
            providers: Vec::new(),
            resolved_resources: Vec::new(),
            execution_plan: ExecutionPlan {
                stages: vec![
                    StagePlan {
                        name: "Source".to_string(),
                        waves: vec![Wave {
                            run_order: 1,
                            actions: vec![checkout],
                        }],
                    },
                    StagePlan {
                        name: "Build".to_string(),
                        waves: vec![Wave {
                            run_order: 2,
                            actions: vec![compile],
                        }],
                    },
                ],
            },
            artifact_map,
        }
    }

    #[test]
    fn test_contract_shape() {
        let value = serde_json::to_value(two_stage()).unwrap();

        assert_eq!(
            value["executionPlan"],
            json!([
                {
                    "name": "Source",
                    "waves": [[{"stage": "Source", "action": "Checkout"}]],
                    "runOrders": [1]
                },
                {
                    "name": "Build",
                    "waves": [[{"stage": "Build", "action": "Compile"}]],
                    "runOrders": [2]
                }
            ])
        );
        assert_eq!(
            value["artifactMap"],
            json!({"src": {"stage": "Source", "action": "Checkout"}})
        );
        assert_eq!(
            value["artifactConsumers"],
            json!({"src": [{"stage": "Build", "action": "Compile"}]})
        );
        assert_eq!(value["resolvedResources"], json!([]));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let synthesis = two_stage();
        assert_eq!(
            synthesis.fingerprint().unwrap(),
            synthesis.clone().fingerprint().unwrap()
        );
        assert_eq!(synthesis.fingerprint().unwrap().len(), 64);
    }
}

//! Provisioner trait and provisioned outputs.
//!
//! Provisioners take a synthesis result to a real (or simulated) cloud and
//! return the attribute values only they can compute, such as ARNs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::{Reference, ResourceId};
use crate::resource::ResolvedResource;
use crate::synthesis::Synthesis;
use crate::{Error, Result};

/// Attribute values returned by a provisioning engine, keyed by resource.
///
/// Values are opaque strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvisionedStack {
    outputs: BTreeMap<ResourceId, BTreeMap<String, String>>,
}

impl ProvisionedStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        resource: ResourceId,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.outputs
            .entry(resource)
            .or_default()
            .insert(attribute.into(), value.into());
    }

    pub fn get(&self, reference: &Reference) -> Option<&str> {
        self.outputs
            .get(&reference.target)
            .and_then(|attrs| attrs.get(&reference.attribute))
            .map(String::as_str)
    }

    pub fn outputs(&self, resource: &ResourceId) -> Option<&BTreeMap<String, String>> {
        self.outputs.get(resource)
    }

    /// Replace every deferred value in `synthesis` with the provisioned string.
    pub fn materialize(&self, synthesis: &Synthesis) -> Result<Vec<ResolvedResource>> {
        let lookup = |reference: &Reference| -> Result<String> {
            self.get(reference).map(str::to_string).ok_or_else(|| {
                Error::NotFound(format!("provisioned value for {}", reference))
            })
        };

        synthesis
            .resolved_resources
            .iter()
            .map(|resource| {
                let attributes = resource
                    .attributes
                    .iter()
                    .map(|(name, value)| value.try_fill(&lookup).map(|v| (name.clone(), v)))
                    .collect::<Result<_>>()?;
                Ok(ResolvedResource {
                    id: resource.id.clone(),
                    attributes,
                })
            })
            .collect()
    }
}

/// Trait for provisioning engines.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Name of this provisioner.
    fn name(&self) -> &'static str;

    /// Provision every resource in dependency order and report computed attributes.
    async fn provision(&self, synthesis: &Synthesis) -> Result<ProvisionedStack>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactMap;
    use crate::id::ResourceKind;
    use crate::plan::ExecutionPlan;
    use crate::resource::ResolvedValue;

    fn synthesis_with_deferred_role() -> Synthesis {
        let role = ResourceId::new(ResourceKind::Role, "Exec");
        let project = ResourceId::new(ResourceKind::BuildProject, "Build");
        Synthesis {
            stack: "test".to_string(),
            providers: Vec::new(),
            resolved_resources: vec![
                ResolvedResource {
                    id: role.clone(),
                    attributes: BTreeMap::new(),
                },
                ResolvedResource {
                    id: project,
                    attributes: BTreeMap::from([(
                        "service-role".to_string(),
                        ResolvedValue::deferred(role.attr("arn")),
                    )]),
                },
            ],
            execution_plan: ExecutionPlan::default(),
            artifact_map: ArtifactMap::new(),
        }
    }

    #[test]
    fn test_materialize_fills_deferred_values() {
        let synthesis = synthesis_with_deferred_role();
        let mut provisioned = ProvisionedStack::new();
        provisioned.insert(
            ResourceId::new(ResourceKind::Role, "Exec"),
            "arn",
            "arn:aws:iam::123456789012:role/exec",
        );

        let resources = provisioned.materialize(&synthesis).unwrap();
        assert_eq!(
            resources[1].attributes["service-role"].as_str(),
            Some("arn:aws:iam::123456789012:role/exec")
        );
    }

    #[test]
    fn test_materialize_reports_missing_value() {
        let synthesis = synthesis_with_deferred_role();
        let err = ProvisionedStack::new().materialize(&synthesis).unwrap_err();
        assert!(matches!(err, Error::NotFound(msg) if msg.contains("role.Exec.arn")));
    }
}

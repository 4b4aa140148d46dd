//! Dry-run provisioner.
//!
//! Fabricates deterministic identifiers for every computed attribute so a
//! plan can be materialized without touching a cloud account.

use async_trait::async_trait;
use stackpipe_core::provisioner::{ProvisionedStack, Provisioner};
use stackpipe_core::resource::ResolvedResource;
use stackpipe_core::{ResourceKind, Result, Synthesis};
use tracing::debug;

const DEFAULT_ACCOUNT: &str = "000000000000";
const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
pub struct DryRunProvisioner {
    account_id: String,
}

impl DryRunProvisioner {
    pub fn new() -> Self {
        Self::with_account(DEFAULT_ACCOUNT)
    }

    pub fn with_account(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }

    fn placeholder(&self, resource: &ResolvedResource, region: &str, attribute: &str) -> String {
        let name = resource
            .attributes
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(&resource.id.name);
        let bucket = resource
            .attributes
            .get("bucket")
            .and_then(|v| v.as_str())
            .unwrap_or(name);
        let account = &self.account_id;

        match (&resource.id.kind, attribute) {
            (ResourceKind::Role, "arn") => format!("arn:aws:iam::{}:role/{}", account, name),
            (ResourceKind::Role, "unique_id") => {
                format!("AROA{}", name.to_ascii_uppercase().replace(['-', '_', '/'], ""))
            }
            (ResourceKind::Bucket, "arn") => format!("arn:aws:s3:::{}", bucket),
            (ResourceKind::Bucket, "bucket") | (ResourceKind::Bucket, "id") => bucket.to_string(),
            (ResourceKind::Bucket, "bucket_domain_name") => format!("{}.s3.amazonaws.com", bucket),
            (ResourceKind::BuildProject, "arn") => {
                format!("arn:aws:codebuild:{}:{}:project/{}", region, account, name)
            }
            (ResourceKind::Pipeline, "arn") => {
                format!("arn:aws:codepipeline:{}:{}:{}", region, account, name)
            }
            _ => name.to_string(),
        }
    }
}

impl Default for DryRunProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provisioner for DryRunProvisioner {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn provision(&self, synthesis: &Synthesis) -> Result<ProvisionedStack> {
        let region = synthesis
            .providers
            .iter()
            .find_map(|p| p.region.as_deref())
            .unwrap_or(DEFAULT_REGION);

        let mut provisioned = ProvisionedStack::new();
        for resource in &synthesis.resolved_resources {
            for attribute in resource.id.kind.computed_attributes() {
                let value = self.placeholder(resource, region, attribute);
                debug!(resource = %resource.id, attribute = *attribute, value = %value, "Simulated output");
                provisioned.insert(resource.id.clone(), *attribute, value);
            }
        }
        Ok(provisioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackpipe_core::{Reference, Resource, ResourceId, Stack};
    use stackpipe_synth::synthesize;

    fn role_stack() -> Stack {
        Stack::new("s")
            .with_provider("aws", Some("eu-west-2".to_string()))
            .with_resource(Resource::new(ResourceKind::Role, "Exec").with_attr("name", "exec-role"))
            .with_resource(
                Resource::new(ResourceKind::BuildProject, "Build")
                    .with_attr("name", "build")
                    .with_attr("service-role", "role.Exec.arn".parse::<Reference>().unwrap()),
            )
    }

    #[tokio::test]
    async fn test_placeholder_arns() {
        let synthesis = synthesize(&role_stack()).unwrap();
        let provisioned = DryRunProvisioner::new().provision(&synthesis).await.unwrap();

        let role = ResourceId::new(ResourceKind::Role, "Exec");
        assert_eq!(
            provisioned.get(&role.attr("arn")),
            Some("arn:aws:iam::000000000000:role/exec-role")
        );
        let project = ResourceId::new(ResourceKind::BuildProject, "Build");
        assert_eq!(
            provisioned.get(&project.attr("arn")),
            Some("arn:aws:codebuild:eu-west-2:000000000000:project/build")
        );
    }

    #[tokio::test]
    async fn test_materialize_fills_deferred() {
        let synthesis = synthesize(&role_stack()).unwrap();
        let provisioned = DryRunProvisioner::with_account("123456789012")
            .provision(&synthesis)
            .await
            .unwrap();

        let resources = provisioned.materialize(&synthesis).unwrap();
        let project = resources
            .iter()
            .find(|r| r.id.kind == ResourceKind::BuildProject)
            .unwrap();
        assert_eq!(
            project.attributes["service-role"].as_str(),
            Some("arn:aws:iam::123456789012:role/exec-role")
        );
        assert!(resources
            .iter()
            .all(|r| r.attributes.values().all(|v| !v.is_deferred())));
    }
}

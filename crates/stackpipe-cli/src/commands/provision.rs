//! Provisioning command.

use anyhow::{Context, Result, bail};
use stackpipe_core::provisioner::Provisioner;
use stackpipe_core::resource::ResolvedResource;
use stackpipe_core::Synthesis;
use tracing::info;

use super::load_synthesis;
use crate::dry_run::DryRunProvisioner;

pub async fn provision(path: &str, dry_run: bool) -> Result<()> {
    if !dry_run {
        bail!("No provisioning engine is configured; rerun with --dry-run");
    }

    let synthesis = load_synthesis(path).await?;
    let resources = run(&DryRunProvisioner::new(), &synthesis).await?;

    let redacted: Vec<ResolvedResource> = resources
        .into_iter()
        .map(|resource| ResolvedResource {
            attributes: resource
                .attributes
                .iter()
                .map(|(name, value)| (name.clone(), value.redacted()))
                .collect(),
            id: resource.id,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

/// Provision `synthesis` and return every resource with deferred values filled in.
pub async fn run(
    provisioner: &dyn Provisioner,
    synthesis: &Synthesis,
) -> Result<Vec<ResolvedResource>> {
    info!(
        provisioner = provisioner.name(),
        stack = %synthesis.stack,
        resources = synthesis.resolved_resources.len(),
        "Provisioning stack"
    );

    let provisioned = provisioner
        .provision(synthesis)
        .await
        .with_context(|| format!("Provisioner '{}' failed", provisioner.name()))?;

    provisioned
        .materialize(synthesis)
        .context("Provisioner did not report every computed attribute")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{CDKTF_PIPELINE, write_fixture};
    use async_trait::async_trait;
    use stackpipe_core::provisioner::ProvisionedStack;
    use stackpipe_core::{Reference, Resource, ResourceKind, Stack};

    /// Reports nothing, leaving every deferred value unfilled.
    struct SilentProvisioner;

    #[async_trait]
    impl Provisioner for SilentProvisioner {
        fn name(&self) -> &'static str {
            "silent"
        }

        async fn provision(&self, _synthesis: &Synthesis) -> stackpipe_core::Result<ProvisionedStack> {
            Ok(ProvisionedStack::new())
        }
    }

    #[tokio::test]
    async fn test_requires_dry_run() {
        let file = write_fixture(CDKTF_PIPELINE);
        let err = provision(file.path().to_str().unwrap(), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--dry-run"));
    }

    #[tokio::test]
    async fn test_dry_run_fixture() {
        let file = write_fixture(CDKTF_PIPELINE);
        provision(file.path().to_str().unwrap(), true).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_provisioned_value() {
        let stack = Stack::new("s")
            .with_resource(Resource::new(ResourceKind::Bucket, "Store"))
            .with_resource(
                Resource::new(ResourceKind::Custom("queue".to_string()), "Events").with_attr(
                    "dead-letter",
                    "bucket.Store.arn".parse::<Reference>().unwrap(),
                ),
            );
        let synthesis = stackpipe_synth::synthesize(&stack).unwrap();

        let err = run(&SilentProvisioner, &synthesis).await.unwrap_err();
        assert!(err.root_cause().to_string().contains("bucket.Store.arn"));
    }
}

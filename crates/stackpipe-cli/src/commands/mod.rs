//! CLI command implementations.

pub mod plan;
pub mod provision;
pub mod synth;

use anyhow::{Context, Result};
use stackpipe_config::{VariableContext, parse_stack_file, required_secrets};
use stackpipe_core::{Stack, Synthesis};
use stackpipe_synth::synthesize;
use tracing::debug;

use crate::secrets::EnvSecretSource;

/// Read, parse and interpolate a stack declaration.
pub async fn load_stack(path: &str) -> Result<Stack> {
    let stack = parse_stack_file(path)
        .with_context(|| format!("Failed to load stack config: {}", path))?;

    let mut ctx = VariableContext::for_stack(&stack);
    ctx.populate_env();

    let secrets = required_secrets(&stack);
    debug!(count = secrets.len(), "Loading secrets");
    ctx.load_secrets(&EnvSecretSource::new(), secrets)
        .await
        .context("Failed to load secrets")?;

    ctx.substitute(stack)
        .with_context(|| format!("Failed to substitute variables in {}", path))
}

/// Load and synthesize the stack at `path`.
pub async fn load_synthesis(path: &str) -> Result<Synthesis> {
    let stack = load_stack(path).await?;
    synthesize(&stack).with_context(|| format!("Synthesis failed for {}", path))
}

pub async fn validate(path: &str) -> Result<()> {
    load_synthesis(path).await?;
    println!("Configuration is valid");
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use stackpipe_config::ConfigError;
    use std::io::Write;

    pub(crate) const CDKTF_PIPELINE: &str = include_str!("../../fixtures/cdktf-pipeline.kdl");

    pub(crate) fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_fixture_stack() {
        let file = write_fixture(CDKTF_PIPELINE);
        let stack = load_stack(file.path().to_str().unwrap()).await.unwrap();

        assert_eq!(stack.name, "CdktfPipelineStack");
        let pipeline = stack.pipelines().next().unwrap();
        let store = pipeline.attr("artifact-store").unwrap().as_map().unwrap();
        assert_eq!(
            store["location"].as_str(),
            Some("codepipeline-eu-west-2-919922704011")
        );
    }

    #[tokio::test]
    async fn test_validate_fixture() {
        let file = write_fixture(CDKTF_PIPELINE);
        validate(file.path().to_str().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_validate_reports_unknown_artifact() {
        let broken = CDKTF_PIPELINE.replace("input \"source_output\"", "input \"wrong_output\"");
        let file = write_fixture(&broken);

        let err = validate(file.path().to_str().unwrap()).await.unwrap_err();
        let root = err.root_cause().to_string();
        assert!(root.contains("wrong_output"), "unexpected error: {}", root);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_stack("/nonexistent/stackpipe.kdl").await.unwrap_err();
        assert!(err.to_string().contains("Failed to load stack config"));
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Io(_))
        ));
    }
}

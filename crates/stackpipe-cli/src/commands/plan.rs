//! Human-readable execution plan.

use anyhow::Result;
use stackpipe_core::Synthesis;

use super::load_synthesis;

pub async fn plan(path: &str) -> Result<()> {
    let synthesis = load_synthesis(path).await?;
    print!("{}", render(&synthesis));
    Ok(())
}

/// List stages, their waves and the artifacts flowing between actions.
pub fn render(synthesis: &Synthesis) -> String {
    let mut lines = vec![format!("Stack: {}", synthesis.stack)];

    for (index, stage) in synthesis.execution_plan.stages.iter().enumerate() {
        lines.push(format!("{}. {}", index + 1, stage.name));
        for wave in &stage.waves {
            let actions: Vec<&str> = wave.actions.iter().map(|a| a.action.as_str()).collect();
            lines.push(format!(
                "   runOrder {}: {}",
                wave.run_order,
                actions.join(", ")
            ));
        }
    }

    if !synthesis.artifact_map.is_empty() {
        lines.push("Artifacts:".to_string());
        for (artifact, flow) in synthesis.artifact_map.iter() {
            let consumers: Vec<String> = flow.consumers.iter().map(|c| c.to_string()).collect();
            let consumers = if consumers.is_empty() {
                "(unused)".to_string()
            } else {
                consumers.join(", ")
            };
            lines.push(format!("   {}: {} -> {}", artifact, flow.producer, consumers));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{CDKTF_PIPELINE, write_fixture};

    #[tokio::test]
    async fn test_render_fixture_plan() {
        let file = write_fixture(CDKTF_PIPELINE);
        let synthesis = load_synthesis(file.path().to_str().unwrap()).await.unwrap();

        assert_eq!(
            render(&synthesis),
            "Stack: CdktfPipelineStack\n\
             1. Source\n   runOrder 1: Source\n\
             2. Build\n   runOrder 1: Build\n\
             Artifacts:\n   source_output: Source/Source -> Build/Build\n"
        );
    }
}

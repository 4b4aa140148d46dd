//! Synthesis output command.

use anyhow::{Context, Result};
use stackpipe_core::Synthesis;
use std::path::Path;
use tracing::info;

use super::load_synthesis;

/// Synthesize the stack at `path` and write the plan as JSON.
pub async fn synth(path: &str, output: Option<&Path>, show_secrets: bool) -> Result<()> {
    let synthesis = load_synthesis(path).await?;
    let fingerprint = synthesis.redacted().fingerprint()?;
    let rendered = render(&synthesis, show_secrets)?;

    match output {
        Some(file) => {
            std::fs::write(file, &rendered)
                .with_context(|| format!("Failed to write output file: {}", file.display()))?;
            info!(output = %file.display(), fingerprint = %fingerprint, "Wrote synthesis");
            println!("Wrote {} (sha256 {})", file.display(), fingerprint);
        }
        None => {
            info!(fingerprint = %fingerprint, "Synthesis rendered");
            println!("{}", rendered);
        }
    }
    Ok(())
}

/// Pretty JSON of the plan, with secrets masked unless `show_secrets`.
pub fn render(synthesis: &Synthesis, show_secrets: bool) -> Result<String> {
    let json = if show_secrets {
        synthesis.to_json_pretty()?
    } else {
        synthesis.redacted().to_json_pretty()?
    };
    Ok(json)
}

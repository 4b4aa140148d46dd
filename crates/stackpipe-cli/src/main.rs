//! stackpipe CLI tool.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod dry_run;
mod secrets;

#[derive(Parser)]
#[command(name = "stackpipe")]
#[command(about = "Synthesize and validate delivery pipeline stacks", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(
        long,
        env = "STACKPIPE_LOG_FORMAT",
        value_enum,
        default_value = "text",
        global = true
    )]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a stack declaration
    Validate {
        /// Path to the stack declaration
        #[arg(default_value = "stackpipe.kdl")]
        path: String,
    },
    /// Synthesize a stack into a provisioning plan
    Synth {
        /// Path to the stack declaration
        #[arg(default_value = "stackpipe.kdl")]
        path: String,
        /// Write the plan to a file instead of stdout
        #[arg(short, long, env = "STACKPIPE_OUTPUT")]
        output: Option<PathBuf>,
        /// Include secret values in the output
        #[arg(long)]
        show_secrets: bool,
    },
    /// Show the execution waves of a stack's pipeline
    Plan {
        /// Path to the stack declaration
        #[arg(default_value = "stackpipe.kdl")]
        path: String,
    },
    /// Provision a stack
    Provision {
        /// Path to the stack declaration
        #[arg(default_value = "stackpipe.kdl")]
        path: String,
        /// Simulate provisioning with placeholder identifiers
        #[arg(long)]
        dry_run: bool,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Validate { path } => {
            commands::validate(&path).await?;
        }
        Commands::Synth {
            path,
            output,
            show_secrets,
        } => {
            commands::synth::synth(&path, output.as_deref(), show_secrets).await?;
        }
        Commands::Plan { path } => {
            commands::plan::plan(&path).await?;
        }
        Commands::Provision { path, dry_run } => {
            commands::provision::provision(&path, dry_run).await?;
        }
    }

    Ok(())
}

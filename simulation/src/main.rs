//! Arbor mesh simulator
//!
//! ```bash
//! # Walk a message down and up the three-node chain
//! arbor-sim chain
//!
//! # Random traffic over a plan, pretty logs
//! arbor-sim --pretty plan --file simulation/plans/line.toml --rounds 20
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use arbor_logging::{ArborSubscriberBuilder, FileConfig, LogConfig};
use arbor_node::MeshPlan;
use arbor_simulation::{run_chain_scenario, run_plan_scenario};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "arbor-sim",
    about = "Run Arbor tree-mesh scenarios over in-memory links",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use pretty console output instead of JSONL
    #[arg(long, global = true)]
    pretty: bool,

    /// Also write JSONL logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the three-node chain [] - [1] - [1,1]
    Chain,

    /// Run random one-byte traffic over a mesh plan
    Plan {
        /// Path to the plan (TOML)
        #[arg(short, long)]
        file: PathBuf,

        /// Number of messages to send
        #[arg(short, long, default_value = "10")]
        rounds: u32,

        /// Pause between messages, in milliseconds
        #[arg(short, long, default_value = "100")]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut builder = ArborSubscriberBuilder::new()
        .with_config(if cli.pretty {
            LogConfig::development()
        } else {
            LogConfig::default()
        })
        .with_level(if cli.verbose { "debug" } else { "info" });
    if let Some(dir) = cli.log_dir {
        builder = builder.with_file_output(FileConfig {
            directory: dir,
            prefix: "arbor-sim".to_string(),
            ..FileConfig::default()
        });
    }
    let _log_guard = builder.init()?;

    match cli.command {
        Commands::Chain => {
            run_chain_scenario().await?;
        }
        Commands::Plan {
            file,
            rounds,
            interval_ms,
        } => {
            let plan = MeshPlan::load(&file)
                .with_context(|| format!("loading plan {}", file.display()))?;
            run_plan_scenario(&plan, rounds, Duration::from_millis(interval_ms)).await?;
        }
    }

    Ok(())
}

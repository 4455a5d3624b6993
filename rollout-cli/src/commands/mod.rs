//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;
mod registry;
mod run;
mod seed;

pub use pipeline::PipelineCommands;
pub use registry::RegistryCommands;
pub use run::RunCommands;

use anyhow::Result;
use clap::Subcommand;
use rollout_core::domain::pipeline::PipelineKind;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Service registry inspection
    Registry {
        #[command(subcommand)]
        command: RegistryCommands,
    },
    /// Generated pipeline inspection
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Run a build or deploy pipeline on this machine
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Register build and deploy jobs with the scheduler
    Seed {
        /// Reconcile against an empty in-memory scheduler and report what would change
        #[arg(long, env = "ROLLOUT_DRY_RUN")]
        dry_run: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Registry { command } => registry::handle_registry_command(command, config),
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config),
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Seed { dry_run } => seed::handle_seed_command(dry_run, config).await,
    }
}

/// Parses a pipeline kind argument (`build` | `deploy`)
fn parse_kind(s: &str) -> Result<PipelineKind> {
    s.parse().map_err(|e: String| anyhow::anyhow!(e))
}

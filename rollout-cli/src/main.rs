//! Rollout CLI
//!
//! Command-line interface for inspecting the service registry, running
//! pipelines locally and seeding the scheduler.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rollout")]
#[command(about = "Rollout build and deploy CLI", long_about = None)]
struct Cli {
    /// Service registry document (JSON or YAML)
    #[arg(long, env = "ROLLOUT_REGISTRY", default_value = "services.json")]
    registry: PathBuf,

    /// Scheduler URL
    #[arg(
        long,
        env = "ROLLOUT_SCHEDULER_URL",
        default_value = "http://localhost:8080"
    )]
    scheduler_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollout_runner=info,rollout_seed=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config {
        registry_path: cli.registry,
        scheduler_url: cli.scheduler_url,
    };

    handle_command(cli.command, &config).await
}

//! Rollout Runner
//!
//! Entry point of the build and deploy jobs registered by the seed process.
//!
//! The scheduler starts this binary with the run surface in the environment:
//! - SERVICE (required): service name from the registry
//! - PIPELINE_KIND (required): build | deploy
//! - ENVIRONMENT (optional, default: dev)
//! - VERSION (optional, default: latest)
//! - ROLLOUT_REGISTRY (optional, default: services.json)
//!
//! The process exits 0 when the run succeeded and 1 otherwise. An abort signal
//! from the scheduler cancels the run between operations.

use anyhow::{Context, Result};
use rollout_core::domain::pipeline::PipelineKind;
use rollout_registry::{find_service, generate_build, generate_deploy, load_file};
use rollout_runner::{
    CancellationFlag, CommandToolchain, Config, PipelineRunner, StandardExecutor,
    spawn_abort_listener,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollout_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Rollout Runner");

    let config = Config::from_env().context("Failed to load runner configuration")?;
    config.validate()?;
    info!(
        "Loaded configuration: project={}, registry={}, analysis_policy={:?}",
        config.project, config.registry_prefix, config.analysis_policy
    );

    let service = std::env::var("SERVICE").context("SERVICE environment variable not set")?;
    let kind: PipelineKind = std::env::var("PIPELINE_KIND")
        .context("PIPELINE_KIND environment variable not set")?
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
    let version = std::env::var("VERSION").unwrap_or_else(|_| "latest".to_string());
    let registry_path =
        std::env::var("ROLLOUT_REGISTRY").unwrap_or_else(|_| "services.json".to_string());

    let services = load_file(&registry_path)
        .with_context(|| format!("Failed to load registry {}", registry_path))?;
    let record = find_service(&services, &service)
        .ok_or_else(|| anyhow::anyhow!("Service '{}' not found in {}", service, registry_path))?;

    let definition = match kind {
        PipelineKind::Build => generate_build(record),
        PipelineKind::Deploy => generate_deploy(record, &environment, &version),
    };

    let toolchain = Arc::new(CommandToolchain::new(config.tools.clone()));
    let executor = Arc::new(StandardExecutor::new(toolchain, &config));
    let cancellation = CancellationFlag::new();
    let runner = PipelineRunner::new(executor, config.workspace_base.clone())
        .with_cancellation(cancellation.clone());

    spawn_abort_listener(cancellation);

    let context = config.initial_context(&service, &environment, &version);
    let result = tokio::task::spawn_blocking(move || runner.run(&definition, context))
        .await
        .context("Pipeline run task failed")?;

    for stage in &result.stages {
        info!("  {} -> {:?}", stage.operation, stage.status);
    }

    if result.succeeded() {
        info!(
            "{} of {} succeeded (version {})",
            kind, service, result.context.version
        );
    } else {
        error!(
            "{} of {} failed at {}: {}",
            kind,
            service,
            result
                .failed_operation
                .map(|op| op.to_string())
                .unwrap_or_else(|| "startup".to_string()),
            result.error_detail.as_deref().unwrap_or("unknown error")
        );
    }

    std::process::exit(result.exit_code());
}

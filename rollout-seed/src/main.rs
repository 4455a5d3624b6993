//! Rollout Seed
//!
//! One-shot job that reconciles the service registry with the scheduler.
//! Exits non-zero when the registry cannot be loaded or any service failed.

use anyhow::{Context, Result};
use rollout_client::{InMemoryScheduler, Scheduler, SchedulerClient};
use rollout_registry::load_file;
use rollout_seed::{SeedConfig, reconcile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollout_seed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Rollout Seed...");

    let config = SeedConfig::from_env().context("Failed to load seed configuration")?;
    config.validate()?;

    let services = load_file(&config.registry_path).with_context(|| {
        format!("Failed to load registry {}", config.registry_path.display())
    })?;
    tracing::info!(
        "Loaded {} services from {}",
        services.len(),
        config.registry_path.display()
    );

    let scheduler: Box<dyn Scheduler> = if config.dry_run {
        tracing::info!("Dry run: reconciling against an empty in-memory scheduler");
        Box::new(InMemoryScheduler::new())
    } else {
        let client = SchedulerClient::new(&config.scheduler_url);
        tracing::info!("Reconciling against {}", client.base_url());
        Box::new(client)
    };

    let report = reconcile(&services, scheduler.as_ref()).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    tracing::info!(
        "Seed finished: {} created, {} updated, {} unchanged, {} failed services",
        report.created(),
        report.updated(),
        report.unchanged(),
        report.failed()
    );

    if report.failed() > 0 {
        anyhow::bail!("{} services failed to reconcile", report.failed());
    }

    Ok(())
}

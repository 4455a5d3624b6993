//! Seed command handler

use anyhow::Result;
use colored::*;
use rollout_client::{InMemoryScheduler, Scheduler, SchedulerClient};
use rollout_core::dto::seed::{SeedReport, ServiceOutcome};
use rollout_seed::reconcile;

use crate::config::Config;

/// Reconciles the registry with the scheduler and prints the report
pub async fn handle_seed_command(dry_run: bool, config: &Config) -> Result<()> {
    let services = config.load_registry()?;

    let scheduler: Box<dyn Scheduler> = if dry_run {
        println!("{}", "Dry run: nothing is sent to the scheduler.".yellow());
        Box::new(InMemoryScheduler::new())
    } else {
        let client = SchedulerClient::new(&config.scheduler_url);
        println!("Reconciling against {}", client.base_url().cyan());
        Box::new(client)
    };

    let report = reconcile(&services, scheduler.as_ref()).await;
    print_report(&report);

    if report.failed() > 0 {
        anyhow::bail!("{} service(s) failed to reconcile", report.failed());
    }

    Ok(())
}

fn print_report(report: &SeedReport) {
    for outcome in &report.services {
        print_outcome(outcome);
    }

    println!(
        "{} created, {} updated, {} unchanged, {} failed",
        report.created().to_string().green(),
        report.updated().to_string().cyan(),
        report.unchanged().to_string().dimmed(),
        report.failed().to_string().red()
    );
}

fn print_outcome(outcome: &ServiceOutcome) {
    let marker = if outcome.is_failed() {
        "✗".red()
    } else {
        "✓".green()
    };
    println!("  {} {}", marker, outcome.service.bold());

    for folder in &outcome.folders_created {
        println!("    + folder {}", folder.cyan());
    }
    for path in &outcome.created {
        println!("    + {}", path.green());
    }
    for path in &outcome.updated {
        println!("    ~ {}", path.cyan());
    }
    for path in &outcome.unchanged {
        println!("    = {}", path.dimmed());
    }
    if let Some(error) = &outcome.error {
        println!("    {}", error.red());
    }
    println!();
}

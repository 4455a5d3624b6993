//! Registry command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use rollout_registry::{RegistryError, ServiceRecord, load_file};

use crate::config::Config;

/// Registry subcommands
#[derive(Subcommand)]
pub enum RegistryCommands {
    /// Load the registry and report every validation issue
    Validate,
    /// List the services in the registry
    List,
}

/// Handle registry commands
pub fn handle_registry_command(command: RegistryCommands, config: &Config) -> Result<()> {
    match command {
        RegistryCommands::Validate => validate_registry(config),
        RegistryCommands::List => list_services(config),
    }
}

fn validate_registry(config: &Config) -> Result<()> {
    let path = config.registry_path.display();
    let services = match load_file(&config.registry_path) {
        Ok(services) => services,
        Err(e) => {
            println!(
                "{}",
                format!("✗ {} {}", path, failure_heading(&e)).red().bold()
            );
            for line in failure_lines(&e) {
                println!("  {} {}", "•".red(), line);
            }
            return Err(e).with_context(|| format!("Registry {} rejected", path));
        }
    };

    println!(
        "{}",
        format!("✓ {} is valid ({} service(s))", path, services.len())
            .green()
            .bold()
    );

    Ok(())
}

fn failure_heading(error: &RegistryError) -> &'static str {
    if error.is_validation() {
        "violates the registry rules:"
    } else if error.is_format() {
        "is not a registry document:"
    } else {
        "could not be read:"
    }
}

fn failure_lines(error: &RegistryError) -> Vec<String> {
    match error {
        RegistryError::Validation { issues } => issues.clone(),
        RegistryError::Format(reason) => vec![reason.clone()],
        RegistryError::Io { source, .. } => vec![source.to_string()],
    }
}

fn list_services(config: &Config) -> Result<()> {
    let services = config.load_registry()?;

    if services.is_empty() {
        println!("{}", "No services found.".yellow());
    } else {
        println!("{}", format!("Found {} service(s):", services.len()).bold());
        println!();
        for service in &services {
            print_service_summary(service);
        }
    }

    Ok(())
}

fn print_service_summary(service: &ServiceRecord) {
    println!("  {} {}", "▸".cyan(), service.name.bold());
    println!(
        "    Source: {} ({})",
        service.source_repository.dimmed(),
        service.source_branch.dimmed()
    );
    println!("    Folder: {}", service.target_folder.dimmed());
    match service.helm_source() {
        Some((repository, branch)) => {
            println!("    Chart:  {} ({})", repository.dimmed(), branch.dimmed())
        }
        None => println!("    Chart:  {}", "bundled".dimmed()),
    }
    println!();
}

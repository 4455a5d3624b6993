//! Pipeline command handlers
//!
//! Shows the operations generated for a service without running them.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use rollout_core::domain::pipeline::{ChartSource, OperationSpec, PipelineDefinition, PipelineKind};
use rollout_registry::{generate_build, generate_deploy, job_registration};

use super::parse_kind;
use crate::config::Config;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Show the generated operations and job registration of a service
    Show {
        /// Service name
        service: String,

        /// Pipeline kind (build | deploy)
        #[arg(short, long, default_value = "build", value_parser = parse_kind)]
        kind: PipelineKind,

        /// Target environment (deploy only)
        #[arg(short, long, default_value = "dev")]
        environment: String,

        /// Version to deploy (deploy only)
        #[arg(short, long, default_value = "latest")]
        version: String,

        /// Print the definition as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle pipeline commands
pub fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    match command {
        PipelineCommands::Show {
            service,
            kind,
            environment,
            version,
            json,
        } => show_pipeline(config, &service, kind, &environment, &version, json),
    }
}

fn show_pipeline(
    config: &Config,
    service: &str,
    kind: PipelineKind,
    environment: &str,
    version: &str,
    json: bool,
) -> Result<()> {
    let record = config.load_service(service)?;

    let definition = match kind {
        PipelineKind::Build => generate_build(&record),
        PipelineKind::Deploy => generate_deploy(&record, environment, version),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&definition)?);
        return Ok(());
    }

    print_pipeline_details(&definition);

    let job = job_registration(&record, kind);
    println!("\n{}", "Scheduler job:".bold());
    println!("  Path:   {}", job.path().cyan());
    println!("  Script: {} @ {}", job.script_path, job.branch.dimmed());
    for param in &job.parameters {
        println!(
            "  Param:  {} {}",
            param.name.cyan(),
            param
                .default
                .as_ref()
                .map(|d| format!("(default {})", d))
                .unwrap_or_default()
                .dimmed()
        );
    }

    Ok(())
}

fn print_pipeline_details(definition: &PipelineDefinition) {
    println!("{}", "Pipeline Details:".bold());
    println!("  Service: {}", definition.service_name.bold());
    println!("  Kind:    {}", definition.kind.to_string().cyan());
    for (key, value) in &definition.parameters {
        println!("  {}: {}", key, value.dimmed());
    }

    println!("\n{}", "Operations:".bold());
    for (index, operation) in definition.operations.iter().enumerate() {
        println!(
            "  {}. {} {}",
            index + 1,
            operation.operation_type().to_string().bold(),
            describe(operation).dimmed()
        );
    }
}

fn describe(operation: &OperationSpec) -> String {
    match operation {
        OperationSpec::ReadVersion { manifest } => manifest.clone(),
        OperationSpec::InstallDependencies { service_dir }
        | OperationSpec::StaticAnalysis { service_dir } => service_dir.clone(),
        OperationSpec::BuildImage {
            service_dir,
            dockerfile,
        } => format!("{} ({})", service_dir, dockerfile),
        OperationSpec::PushImage => String::new(),
        OperationSpec::FetchHelmChart { repository, branch } => {
            format!("{} @ {}", repository, branch)
        }
        OperationSpec::DeployRelease {
            release,
            namespace,
            chart,
            values_file,
        } => {
            let chart = match chart {
                ChartSource::Bundled => "bundled chart",
                ChartSource::Fetched => "fetched chart",
            };
            format!("{} -n {} ({}, {})", release, namespace, chart, values_file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_deploy_release() {
        let op = OperationSpec::DeployRelease {
            release: "api".to_string(),
            namespace: "staging".to_string(),
            chart: ChartSource::Fetched,
            values_file: "api-values.yaml".to_string(),
        };
        assert_eq!(describe(&op), "api -n staging (fetched chart, api-values.yaml)");
        assert_eq!(describe(&OperationSpec::PushImage), "");
    }
}

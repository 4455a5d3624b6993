//! Run command handlers
//!
//! Runs a generated pipeline in-process with the same executor the
//! scheduler jobs use.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use rollout_core::domain::run::{RunResult, StageStatus};
use rollout_registry::{generate_build, generate_deploy};
use rollout_runner::{
    AnalysisPolicy, CancellationFlag, CommandToolchain, Config as RunnerConfig, PipelineRunner,
    StandardExecutor, ToolchainConfig, spawn_abort_listener,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// Build and push the image of a service
    Build {
        /// Service name
        service: String,

        /// Environment the image is tagged under
        #[arg(short, long, default_value = "dev")]
        environment: String,

        #[command(flatten)]
        settings: RunSettings,
    },
    /// Deploy a service version to an environment
    Deploy {
        /// Service name
        service: String,

        /// Target environment
        #[arg(short, long, default_value = "dev")]
        environment: String,

        /// Version to deploy
        #[arg(short, long, default_value = "latest")]
        version: String,

        #[command(flatten)]
        settings: RunSettings,
    },
}

/// Runner settings, each falling back to the runner's environment variable
#[derive(Args)]
pub struct RunSettings {
    #[arg(long, env = "ROLLOUT_PROJECT")]
    project: String,

    #[arg(long, env = "ROLLOUT_ACCOUNT", default_value = "")]
    account: String,

    #[arg(long, env = "ROLLOUT_REGION", default_value = "us-east-1")]
    region: String,

    /// Overrides the registry host derived from account and region
    #[arg(long, env = "ROLLOUT_REGISTRY_PREFIX")]
    registry_prefix: Option<String>,

    #[arg(long, env = "ROLLOUT_SOURCE_ROOT", default_value = ".")]
    source_root: PathBuf,

    #[arg(long, env = "ROLLOUT_WORKSPACE_BASE")]
    workspace_base: Option<PathBuf>,

    #[arg(long, env = "ROLLOUT_CHART_ROOT", default_value = "helm")]
    chart_root: PathBuf,

    #[arg(long, env = "ROLLOUT_VALUES_DIR", default_value = "helm/values")]
    values_dir: PathBuf,

    /// fatal | advisory
    #[arg(long, env = "ROLLOUT_ANALYSIS_POLICY", default_value = "fatal", value_parser = parse_policy)]
    analysis_policy: AnalysisPolicy,

    /// Print tool commands instead of running them
    #[arg(long, env = "ROLLOUT_DRY_RUN")]
    dry_run: bool,
}

fn parse_policy(s: &str) -> Result<AnalysisPolicy> {
    s.parse()
}

impl RunSettings {
    fn into_config(self) -> Result<RunnerConfig> {
        if self.account.is_empty() && self.registry_prefix.is_none() {
            anyhow::bail!("--account or --registry-prefix is required");
        }

        let mut config = RunnerConfig::new(self.project, self.account, self.region);
        if let Some(prefix) = self.registry_prefix {
            config.registry_prefix = prefix;
        }
        if let Some(base) = self.workspace_base {
            config.workspace_base = base;
        }
        config.source_root = self.source_root;
        config.chart_root = self.chart_root;
        config.values_dir = self.values_dir;
        config.tools = ToolchainConfig {
            dry_run: self.dry_run,
            ..ToolchainConfig::from_env(&config.region)
        };

        let config = config.with_analysis_policy(self.analysis_policy);
        config.validate()?;
        Ok(config)
    }
}

/// Handle run commands
pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let (record, definition, environment, version, settings) = match command {
        RunCommands::Build {
            service,
            environment,
            settings,
        } => {
            let record = config.load_service(&service)?;
            let definition = generate_build(&record);
            (record, definition, environment, "latest".to_string(), settings)
        }
        RunCommands::Deploy {
            service,
            environment,
            version,
            settings,
        } => {
            let record = config.load_service(&service)?;
            let definition = generate_deploy(&record, &environment, &version);
            (record, definition, environment, version, settings)
        }
    };

    let runner_config = settings.into_config()?;
    let context = runner_config.initial_context(&record.name, &environment, &version);

    let toolchain = Arc::new(CommandToolchain::new(runner_config.tools.clone()));
    let executor = Arc::new(StandardExecutor::new(toolchain, &runner_config));
    let cancellation = CancellationFlag::new();
    let runner = PipelineRunner::new(executor, runner_config.workspace_base.clone())
        .with_cancellation(cancellation.clone());

    // Ctrl-C stops the run after the current operation instead of killing the
    // process with the workspace still on disk
    let listener = spawn_abort_listener(cancellation);

    println!(
        "{}",
        format!("Running {} of {}...", definition.kind, record.name).bold()
    );

    let result = tokio::task::spawn_blocking(move || runner.run(&definition, context))
        .await
        .context("Pipeline run task failed")?;
    listener.abort();

    print_run_result(&result);

    if !result.succeeded() {
        anyhow::bail!("{} of {} failed", result.kind, result.service);
    }

    Ok(())
}

fn print_run_result(result: &RunResult) {
    for stage in &result.stages {
        let marker = match stage.status {
            StageStatus::Succeeded => "✓".green(),
            StageStatus::Advisory => "!".yellow(),
            StageStatus::Failed => "✗".red(),
        };
        let elapsed = stage.finished_at - stage.started_at;
        println!(
            "  {} {} {}",
            marker,
            stage.operation.to_string().bold(),
            format!("({} ms)", elapsed.num_milliseconds()).dimmed()
        );
        if let Some(detail) = &stage.detail {
            println!("      {}", detail.dimmed());
        }
    }

    println!();
    if result.succeeded() {
        println!("{}", "✓ Run succeeded!".green().bold());
        println!("  Run ID:  {}", result.run_id.to_string().dimmed());
        println!("  Image:   {}", result.context.image_ref().cyan());
    } else {
        println!("{}", "✗ Run failed".red().bold());
        println!("  Run ID:  {}", result.run_id.to_string().dimmed());
        if let Some(operation) = result.failed_operation {
            println!("  Stage:   {}", operation.to_string().yellow());
        }
        if let Some(detail) = &result.error_detail {
            println!("  Error:   {}", detail);
        }
    }
}

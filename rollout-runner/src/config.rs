//! Runner configuration
//!
//! Defines all configurable parameters for pipeline runs including the
//! project and registry identity, on-disk locations and the analysis policy.

use rollout_core::domain::context::ExecutionContext;
use std::path::PathBuf;
use std::str::FromStr;

use crate::toolchain::ToolchainConfig;

/// What a failing static analysis does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisPolicy {
    /// Scanner failure fails the run
    #[default]
    Fatal,
    /// Scanner failure is logged and the run continues
    Advisory,
}

impl FromStr for AnalysisPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(AnalysisPolicy::Fatal),
            "advisory" => Ok(AnalysisPolicy::Advisory),
            other => anyhow::bail!("unknown analysis policy '{}' (expected fatal or advisory)", other),
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project name used in image paths and analysis keys
    pub project: String,

    /// Cloud region of the image registry
    pub region: String,

    /// Account that owns the image registry
    pub account: String,

    /// Registry host images are tagged with
    /// (defaults to `<account>.dkr.ecr.<region>.amazonaws.com`)
    pub registry_prefix: String,

    /// Parent directory of per-run workspaces
    pub workspace_base: PathBuf,

    /// Checked-out source tree holding one directory per service
    pub source_root: PathBuf,

    /// Bundled chart root, one chart directory per service
    pub chart_root: PathBuf,

    /// Directory holding `<service>-values.yaml` files
    pub values_dir: PathBuf,

    pub analysis_policy: AnalysisPolicy,

    /// External tool binaries and dry-run switch
    pub tools: ToolchainConfig,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(project: String, account: String, region: String) -> Self {
        let registry_prefix = ecr_registry(&account, &region);
        Self {
            project,
            region,
            account,
            registry_prefix,
            workspace_base: std::env::temp_dir().join("rollout"),
            source_root: PathBuf::from("."),
            chart_root: PathBuf::from("helm"),
            values_dir: PathBuf::from("helm/values"),
            analysis_policy: AnalysisPolicy::Fatal,
            tools: ToolchainConfig::default(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ROLLOUT_PROJECT (required)
    /// - ROLLOUT_ACCOUNT (required unless ROLLOUT_REGISTRY_PREFIX is set)
    /// - ROLLOUT_REGION (optional, default: us-east-1)
    /// - ROLLOUT_REGISTRY_PREFIX (optional, overrides the derived registry host)
    /// - ROLLOUT_WORKSPACE_BASE (optional, default: <tmp>/rollout)
    /// - ROLLOUT_SOURCE_ROOT (optional, default: .)
    /// - ROLLOUT_CHART_ROOT (optional, default: helm)
    /// - ROLLOUT_VALUES_DIR (optional, default: helm/values)
    /// - ROLLOUT_ANALYSIS_POLICY (optional, fatal | advisory, default: fatal)
    /// - ROLLOUT_DRY_RUN (optional, default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let project = std::env::var("ROLLOUT_PROJECT")
            .map_err(|_| anyhow::anyhow!("ROLLOUT_PROJECT environment variable not set"))?;

        let registry_prefix = std::env::var("ROLLOUT_REGISTRY_PREFIX").ok();
        let account = match (std::env::var("ROLLOUT_ACCOUNT"), &registry_prefix) {
            (Ok(account), _) => account,
            (Err(_), Some(_)) => String::new(),
            (Err(_), None) => anyhow::bail!(
                "ROLLOUT_ACCOUNT or ROLLOUT_REGISTRY_PREFIX environment variable must be set"
            ),
        };

        let region = std::env::var("ROLLOUT_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let mut config = Self::new(project, account, region);

        if let Some(prefix) = registry_prefix {
            config.registry_prefix = prefix;
        }
        if let Ok(dir) = std::env::var("ROLLOUT_WORKSPACE_BASE") {
            config.workspace_base = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("ROLLOUT_SOURCE_ROOT") {
            config.source_root = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("ROLLOUT_CHART_ROOT") {
            config.chart_root = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("ROLLOUT_VALUES_DIR") {
            config.values_dir = PathBuf::from(dir);
        }
        if let Ok(policy) = std::env::var("ROLLOUT_ANALYSIS_POLICY") {
            config.analysis_policy = policy.parse()?;
        }

        config.tools = ToolchainConfig::from_env(&config.region);

        Ok(config)
    }

    /// Sets the analysis policy
    pub fn with_analysis_policy(mut self, policy: AnalysisPolicy) -> Self {
        self.analysis_policy = policy;
        self
    }

    /// Initial execution context for a run of `service`
    pub fn initial_context(&self, service: &str, environment: &str, version: &str) -> ExecutionContext {
        ExecutionContext::new(
            service,
            environment,
            version,
            self.project.as_str(),
            self.registry_prefix.as_str(),
        )
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.project.trim().is_empty() {
            anyhow::bail!("project cannot be empty");
        }

        if self.registry_prefix.trim().is_empty() {
            anyhow::bail!("registry_prefix cannot be empty");
        }

        if self.registry_prefix.contains("://") {
            anyhow::bail!("registry_prefix must be a host, not a URL");
        }

        if self.workspace_base.as_os_str().is_empty() {
            anyhow::bail!("workspace_base cannot be empty");
        }

        Ok(())
    }
}

/// ECR registry host for an account and region
pub fn ecr_registry(account: &str, region: &str) -> String {
    format!("{}.dkr.ecr.{}.amazonaws.com", account, region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new(
            "shop".to_string(),
            "123456789012".to_string(),
            "eu-west-1".to_string(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = config();
        assert_eq!(
            config.registry_prefix,
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com"
        );
        assert_eq!(config.analysis_policy, AnalysisPolicy::Fatal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = config();

        config.project = String::new();
        assert!(config.validate().is_err());

        config.project = "shop".to_string();
        config.registry_prefix = "https://registry.example.com".to_string();
        assert!(config.validate().is_err());

        config.registry_prefix = "registry.example.com/team".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_initial_context_uses_project_and_registry() {
        let ctx = config().initial_context("backend", "dev", "1.0.0");
        assert_eq!(
            ctx.image_ref(),
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com/shop/dev/backend:1.0.0"
        );
    }

    #[test]
    fn test_analysis_policy_parsing() {
        assert_eq!("advisory".parse::<AnalysisPolicy>().unwrap(), AnalysisPolicy::Advisory);
        assert_eq!(" FATAL ".parse::<AnalysisPolicy>().unwrap(), AnalysisPolicy::Fatal);
        assert!("lenient".parse::<AnalysisPolicy>().is_err());

        let config = config().with_analysis_policy(AnalysisPolicy::Advisory);
        assert_eq!(config.analysis_policy, AnalysisPolicy::Advisory);
    }
}

//! Seed configuration

use std::path::PathBuf;

/// Seed process configuration
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Registry document to reconcile
    pub registry_path: PathBuf,

    /// Base URL of the scheduler API
    pub scheduler_url: String,

    /// Reconcile against an in-memory scheduler instead of the real one
    pub dry_run: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from("services.json"),
            scheduler_url: "http://localhost:8080".to_string(),
            dry_run: false,
        }
    }
}

impl SeedConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ROLLOUT_REGISTRY (optional, default: services.json)
    /// - ROLLOUT_SCHEDULER_URL (optional, default: http://localhost:8080)
    /// - ROLLOUT_DRY_RUN (optional, default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("ROLLOUT_REGISTRY") {
            config.registry_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("ROLLOUT_SCHEDULER_URL") {
            config.scheduler_url = url;
        }
        if let Ok(flag) = std::env::var("ROLLOUT_DRY_RUN") {
            config.dry_run = parse_flag(&flag)?;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.registry_path.as_os_str().is_empty() {
            anyhow::bail!("registry_path cannot be empty");
        }

        if !self.dry_run
            && !(self.scheduler_url.starts_with("http://")
                || self.scheduler_url.starts_with("https://"))
        {
            anyhow::bail!("scheduler_url must be an http(s) URL");
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => anyhow::bail!("invalid boolean '{}'", other),
    }
}

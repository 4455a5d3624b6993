//! Configuration module
//!
//! Handles CLI configuration: where the registry lives and which scheduler to talk to.

use anyhow::{Context, Result};
use rollout_registry::{ServiceRecord, find_service, load_file};
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Service registry document
    pub registry_path: PathBuf,
    /// URL of the job scheduler
    pub scheduler_url: String,
}

impl Config {
    /// Loads and validates the registry
    pub fn load_registry(&self) -> Result<Vec<ServiceRecord>> {
        load_file(&self.registry_path).with_context(|| {
            format!("Failed to load registry {}", self.registry_path.display())
        })
    }

    /// Loads the registry and looks up one service
    pub fn load_service(&self, name: &str) -> Result<ServiceRecord> {
        let services = self.load_registry()?;
        find_service(&services, name).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "Service '{}' not found in {}",
                name,
                self.registry_path.display()
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(registry: &str) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.json");
        std::fs::write(&path, registry).unwrap();
        let config = Config {
            registry_path: path,
            scheduler_url: "http://localhost:8080".to_string(),
        };
        (dir, config)
    }

    #[test]
    fn test_load_service_by_name() {
        let (_dir, config) = config_for(
            r#"{"services": [{
                "name": "backend",
                "sourceRepository": "https://git.example.com/shop/backend.git",
                "buildPipelinePath": "ci/build.groovy",
                "deployPipelinePath": "ci/deploy.groovy",
                "targetFolder": "shop/services"
            }]}"#,
        );

        let service = config.load_service("backend").unwrap();
        assert_eq!(service.target_folder, "shop/services");
        assert!(config.load_service("frontend").is_err());
    }

    #[test]
    fn test_invalid_registry_is_reported() {
        let (_dir, config) = config_for(r#"{"services": [{"name": "backend"}]}"#);
        let err = config.load_registry().unwrap_err();
        assert!(err.to_string().contains("Failed to load registry"));
    }
}

//! Service domain types

use serde::{Deserialize, Serialize};

/// Branch used when a registry entry does not name one
pub const DEFAULT_BRANCH: &str = "main";

/// One deployable unit from the service registry
///
/// Created once when the registry is loaded and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    /// Unique service identifier
    pub name: String,

    /// Repository holding the service source and its pipeline scripts
    pub source_repository: String,

    #[serde(default = "default_branch")]
    pub source_branch: String,

    /// Entry-point script of the build job, relative to the repository root
    pub build_pipeline_path: String,

    /// Entry-point script of the deploy job, relative to the repository root
    pub deploy_pipeline_path: String,

    /// Scheduler folder the jobs are registered under (`/`-delimited)
    pub target_folder: String,

    /// Repository holding the Helm chart, when it is not bundled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_branch: Option<String>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl ServiceRecord {
    /// Segments of the target folder, in order
    pub fn folder_segments(&self) -> impl Iterator<Item = &str> {
        self.target_folder.trim_matches('/').split('/')
    }

    /// Every folder path that must exist for the target folder, parents first
    ///
    /// `platform/apps` yields `platform` then `platform/apps`.
    pub fn folder_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        let mut current = String::new();
        for segment in self.folder_segments() {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            paths.push(current.clone());
        }
        paths
    }

    /// The chart repository and branch, if the chart is fetched at deploy time
    pub fn helm_source(&self) -> Option<(&str, &str)> {
        match (&self.helm_repository, &self.helm_branch) {
            (Some(repository), Some(branch)) => Some((repository, branch)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_branch_defaults_to_main() {
        let record: ServiceRecord = serde_json::from_value(serde_json::json!({
            "name": "backend",
            "sourceRepository": "https://git.example.com/shop/backend.git",
            "buildPipelinePath": "ci/build.groovy",
            "deployPipelinePath": "ci/deploy.groovy",
            "targetFolder": "shop/services"
        }))
        .unwrap();

        assert_eq!(record.source_branch, "main");
        assert!(record.helm_source().is_none());
    }

    #[test]
    fn test_folder_paths_are_cumulative() {
        let record: ServiceRecord = serde_json::from_value(serde_json::json!({
            "name": "backend",
            "sourceRepository": "https://git.example.com/shop/backend.git",
            "buildPipelinePath": "ci/build.groovy",
            "deployPipelinePath": "ci/deploy.groovy",
            "targetFolder": "/shop/services/backend/"
        }))
        .unwrap();

        assert_eq!(
            record.folder_paths(),
            vec!["shop", "shop/services", "shop/services/backend"]
        );
    }
}

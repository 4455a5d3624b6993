//! Scheduler job DTOs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::pipeline::PipelineKind;

/// A parameter the scheduler prompts for when the job is triggered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub description: String,
    pub default: Option<String>,
}

/// A job as registered with the scheduler
///
/// Two registrations are equal exactly when the scheduler would hold the
/// same job, which is what reconciliation compares on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRegistration {
    pub folder: String,
    pub name: String,
    pub kind: PipelineKind,
    pub description: String,
    pub repository: String,
    pub branch: String,
    /// Entry-point script inside the repository
    pub script_path: String,
    pub parameters: Vec<ParameterDefinition>,
    /// Environment variables injected into every run of the job
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl JobRegistration {
    /// Hierarchical job path: `<folder>/<name>`
    pub fn path(&self) -> String {
        join_path(&self.folder, &self.name)
    }
}

/// Request to create a folder in the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    pub path: String,
}

/// Joins folder and name, tolerating stray slashes
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("shop/services/", "api-build"), "shop/services/api-build");
        assert_eq!(join_path("", "api-build"), "api-build");
    }
}

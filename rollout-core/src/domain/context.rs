//! Execution context for one pipeline run
//!
//! Replaces an ambient environment bag: the context is passed to every
//! operation and operations hand back the fields they changed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Context key for the resolved version
pub const VERSION: &str = "version";

/// Context key for the environment
pub const ENVIRONMENT: &str = "environment";

/// Extension key set by FetchHelmChart with the cloned chart root
pub const CHART_ROOT: &str = "chartRoot";

/// Mutable state threaded through one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub service: String,
    pub environment: String,
    pub version: String,
    pub project: String,

    /// Registry host (and optional path) images are pushed to
    pub registry_prefix: String,

    /// Scoped working directory of the run, set by the runner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,

    /// Free-form values set by individual operations
    #[serde(default)]
    pub extensions: BTreeMap<String, String>,
}

impl ExecutionContext {
    pub fn new(
        service: impl Into<String>,
        environment: impl Into<String>,
        version: impl Into<String>,
        project: impl Into<String>,
        registry_prefix: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            environment: environment.into(),
            version: version.into(),
            project: project.into(),
            registry_prefix: registry_prefix.into().trim_end_matches('/').to_string(),
            workspace: None,
            extensions: BTreeMap::new(),
        }
    }

    /// Image repository without tag: `<registry>/<project>/<environment>/<service>`
    pub fn image_prefix(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.registry_prefix, self.project, self.environment, self.service
        )
    }

    /// Image tag, always the current version
    pub fn image_tag(&self) -> &str {
        &self.version
    }

    /// Fully qualified image reference
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image_prefix(), self.image_tag())
    }

    /// Static analysis project key: `<project>-<environment>-<service>`
    pub fn project_key(&self) -> String {
        format!("{}-{}-{}", self.project, self.environment, self.service)
    }

    /// Looks up a named field or extension
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "service" => Some(&self.service),
            ENVIRONMENT => Some(&self.environment),
            VERSION => Some(&self.version),
            "project" => Some(&self.project),
            _ => self.extensions.get(key).map(String::as_str),
        }
    }

    /// Merges fields returned by an operation
    ///
    /// Known keys overwrite the typed fields, anything else lands in `extensions`.
    pub fn apply(&mut self, update: ContextUpdate) {
        for (key, value) in update.fields {
            match key.as_str() {
                VERSION => self.version = value,
                ENVIRONMENT => self.environment = value,
                _ => {
                    self.extensions.insert(key, value);
                }
            }
        }
    }
}

/// Fields an operation changed, keyed by context key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUpdate {
    pub fields: BTreeMap<String, String>,
}

impl ContextUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            "backend",
            "staging",
            "1.0.0",
            "shop",
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com/",
        )
    }

    #[test]
    fn test_image_reference_layout() {
        let ctx = context();
        assert_eq!(
            ctx.image_ref(),
            "123456789012.dkr.ecr.eu-west-1.amazonaws.com/shop/staging/backend:1.0.0"
        );
        assert_eq!(ctx.project_key(), "shop-staging-backend");
    }

    #[test]
    fn test_apply_overrides_version_and_extends() {
        let mut ctx = context();
        ctx.apply(
            ContextUpdate::new()
                .with(VERSION, "2.3.1")
                .with(CHART_ROOT, "/tmp/charts"),
        );

        assert_eq!(ctx.version, "2.3.1");
        assert_eq!(ctx.image_tag(), "2.3.1");
        assert!(ctx.image_ref().ends_with("backend:2.3.1"));
        assert_eq!(ctx.get(CHART_ROOT), Some("/tmp/charts"));
    }
}

//! Service registry loader
//!
//! This module parses the registry document into `ServiceRecord`s and
//! validates the registry-wide invariants before any record is handed out.
//!
//! The document is either `{ "services": [...] }` or a bare list of services,
//! in JSON or YAML. Field names are camelCase.

use rollout_core::domain::service::{DEFAULT_BRANCH, ServiceRecord};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::error::{RegistryError, Result};

/// Serialization format of a registry document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryFormat {
    Json,
    Yaml,
}

impl RegistryFormat {
    /// Picks the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => RegistryFormat::Yaml,
            _ => RegistryFormat::Json,
        }
    }
}

/// Registry entry as written, before validation
///
/// Every field is optional here so that a missing field is reported as a
/// validation issue naming the service rather than a bare parse error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawService {
    name: Option<String>,
    source_repository: Option<String>,
    source_branch: Option<String>,
    build_pipeline_path: Option<String>,
    deploy_pipeline_path: Option<String>,
    target_folder: Option<String>,
    helm_repository: Option<String>,
    helm_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Wrapped { services: Vec<RawService> },
    List(Vec<RawService>),
}

impl RawDocument {
    fn into_services(self) -> Vec<RawService> {
        match self {
            RawDocument::Wrapped { services } => services,
            RawDocument::List(services) => services,
        }
    }
}

/// Load the registry from source text
///
/// # Errors
/// - `RegistryError::Format` if the text is not a registry document
/// - `RegistryError::Validation` listing every invariant violation
///   (duplicate name, missing or empty required field, empty folder segment,
///   `helmRepository` without `helmBranch`)
///
/// # Example
/// ```
/// use rollout_registry::{RegistryFormat, load};
///
/// let source = r#"{"services": [{
///     "name": "backend",
///     "sourceRepository": "https://git.example.com/shop/backend.git",
///     "buildPipelinePath": "ci/build.groovy",
///     "deployPipelinePath": "ci/deploy.groovy",
///     "targetFolder": "shop/services"
/// }]}"#;
///
/// let services = load(source, RegistryFormat::Json)?;
/// assert_eq!(services[0].source_branch, "main");
/// # Ok::<(), rollout_registry::RegistryError>(())
/// ```
pub fn load(source: &str, format: RegistryFormat) -> Result<Vec<ServiceRecord>> {
    let document: RawDocument = match format {
        RegistryFormat::Json => {
            serde_json::from_str(source).map_err(|e| RegistryError::Format(e.to_string()))?
        }
        RegistryFormat::Yaml => {
            serde_yaml::from_str(source).map_err(|e| RegistryError::Format(e.to_string()))?
        }
    };

    let raw = document.into_services();
    debug!("Parsed {} registry entries", raw.len());

    validate(raw)
}

/// Load the registry from a file, choosing the format by extension
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<ServiceRecord>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    load(&source, RegistryFormat::from_path(path))
}

/// Find a service by name in a loaded registry
pub fn find_service<'a>(services: &'a [ServiceRecord], name: &str) -> Option<&'a ServiceRecord> {
    services.iter().find(|s| s.name == name)
}

fn validate(raw: Vec<RawService>) -> Result<Vec<ServiceRecord>> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(raw.len());

    for (idx, entry) in raw.into_iter().enumerate() {
        let label = match entry.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("service '{}'", name),
            _ => format!("service #{}", idx + 1),
        };

        let mut require = |field: &str, value: Option<String>| -> Option<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
                _ => {
                    issues.push(format!("{}: missing required field '{}'", label, field));
                    None
                }
            }
        };

        let name = require("name", entry.name);
        let source_repository = require("sourceRepository", entry.source_repository);
        let build_pipeline_path = require("buildPipelinePath", entry.build_pipeline_path);
        let deploy_pipeline_path = require("deployPipelinePath", entry.deploy_pipeline_path);
        let target_folder = require("targetFolder", entry.target_folder);

        if let Some(ref folder) = target_folder {
            if folder.trim_matches('/').split('/').any(|s| s.trim().is_empty()) {
                issues.push(format!(
                    "{}: targetFolder '{}' has an empty segment",
                    label, folder
                ));
            }
        }

        let helm_repository = non_empty(entry.helm_repository);
        let helm_branch = non_empty(entry.helm_branch);
        if helm_repository.is_some() && helm_branch.is_none() {
            issues.push(format!("{}: helmRepository is set but helmBranch is not", label));
        }

        if let Some(ref name) = name {
            if !seen.insert(name.clone()) {
                issues.push(format!("duplicate service name '{}'", name));
            }
        }

        if let (
            Some(name),
            Some(source_repository),
            Some(build_pipeline_path),
            Some(deploy_pipeline_path),
            Some(target_folder),
        ) = (
            name,
            source_repository,
            build_pipeline_path,
            deploy_pipeline_path,
            target_folder,
        ) {
            records.push(ServiceRecord {
                name,
                source_repository,
                source_branch: non_empty(entry.source_branch)
                    .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                build_pipeline_path,
                deploy_pipeline_path,
                target_folder,
                helm_repository,
                helm_branch,
            });
        }
    }

    if !issues.is_empty() {
        return Err(RegistryError::Validation { issues });
    }

    Ok(records)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

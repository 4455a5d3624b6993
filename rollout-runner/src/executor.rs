//! Operation executor
//!
//! Runs a single `OperationSpec` against an `ExecutionContext`:
//! - Resolving paths against the configured source, chart and values roots
//! - Delegating the work to the `Toolchain`
//! - Returning the context fields the operation changed
//!
//! The executor keeps no state between calls.

use rollout_core::domain::context::{CHART_ROOT, ContextUpdate, ExecutionContext, VERSION};
use rollout_core::domain::pipeline::{ChartSource, OperationSpec, OperationType};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{AnalysisPolicy, Config};
use crate::error::{OperationError, Result};
use crate::toolchain::{ReleaseRequest, Toolchain};

/// Directory FetchHelmChart clones into, relative to the run workspace
pub const FETCHED_CHARTS_DIR: &str = "charts";

/// Uniform result of one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub updated_fields: ContextUpdate,
    pub error_detail: Option<String>,
    /// Set when a failure was downgraded by policy
    pub warning: Option<String>,
}

impl ExecutionResult {
    pub fn success(updated_fields: ContextUpdate) -> Self {
        Self {
            success: true,
            updated_fields,
            error_detail: None,
            warning: None,
        }
    }

    pub fn failed(error_detail: impl Into<String>) -> Self {
        Self {
            success: false,
            updated_fields: ContextUpdate::new(),
            error_detail: Some(error_detail.into()),
            warning: None,
        }
    }

    pub fn advisory(warning: impl Into<String>) -> Self {
        Self {
            success: true,
            updated_fields: ContextUpdate::new(),
            error_detail: None,
            warning: Some(warning.into()),
        }
    }
}

/// Executes one operation of a pipeline
pub trait OperationExecutor: Send + Sync {
    fn execute(&self, spec: &OperationSpec, context: &ExecutionContext) -> ExecutionResult;
}

/// Executor delegating every operation to a `Toolchain`
pub struct StandardExecutor {
    toolchain: Arc<dyn Toolchain>,
    source_root: PathBuf,
    chart_root: PathBuf,
    values_dir: PathBuf,
    analysis_policy: AnalysisPolicy,
}

impl StandardExecutor {
    pub fn new(toolchain: Arc<dyn Toolchain>, config: &Config) -> Self {
        Self {
            toolchain,
            source_root: config.source_root.clone(),
            chart_root: config.chart_root.clone(),
            values_dir: config.values_dir.clone(),
            analysis_policy: config.analysis_policy,
        }
    }

    fn dispatch(&self, spec: &OperationSpec, ctx: &ExecutionContext) -> Result<ContextUpdate> {
        match spec {
            OperationSpec::ReadVersion { manifest } => self.read_version(manifest),
            OperationSpec::InstallDependencies { service_dir } => {
                let dir = self.source_root.join(service_dir);
                self.toolchain
                    .install_dependencies(&dir)
                    .map_err(OperationError::DependencyInstall)?;
                Ok(ContextUpdate::new())
            }
            OperationSpec::StaticAnalysis { service_dir } => {
                let dir = self.source_root.join(service_dir);
                let project_key = ctx.project_key();
                info!("Running static analysis for project key {}", project_key);
                self.toolchain
                    .analyze(&dir, &project_key)
                    .map_err(OperationError::Analysis)?;
                Ok(ContextUpdate::new())
            }
            OperationSpec::BuildImage {
                service_dir,
                dockerfile,
            } => {
                let image = ctx.image_ref();
                info!("Building image {}", image);
                self.toolchain
                    .build_image(
                        &self.source_root.join(service_dir),
                        &self.source_root.join(dockerfile),
                        &image,
                    )
                    .map_err(OperationError::ImageBuild)?;
                Ok(ContextUpdate::new())
            }
            OperationSpec::PushImage => {
                let image = ctx.image_ref();
                info!("Pushing image {}", image);
                self.toolchain
                    .push_image(&image)
                    .map_err(OperationError::ImagePush)?;
                Ok(ContextUpdate::new())
            }
            OperationSpec::FetchHelmChart { repository, branch } => {
                let workspace = ctx.workspace.as_deref().ok_or_else(|| {
                    OperationError::MissingContext {
                        operation: OperationType::FetchHelmChart,
                        key: "workspace".to_string(),
                    }
                })?;
                let dest = workspace.join(FETCHED_CHARTS_DIR);
                info!("Fetching charts from {}@{}", repository, branch);
                self.toolchain
                    .clone_repository(repository, branch, &dest)
                    .map_err(OperationError::ChartFetch)?;
                Ok(ContextUpdate::new().with(CHART_ROOT, dest.to_string_lossy()))
            }
            OperationSpec::DeployRelease {
                release,
                namespace,
                chart,
                values_file,
            } => {
                let chart_root = match chart {
                    ChartSource::Bundled => self.chart_root.clone(),
                    ChartSource::Fetched => ctx.get(CHART_ROOT).map(PathBuf::from).ok_or_else(
                        || OperationError::MissingContext {
                            operation: OperationType::DeployRelease,
                            key: CHART_ROOT.to_string(),
                        },
                    )?,
                };

                let request = ReleaseRequest {
                    release: release.clone(),
                    namespace: namespace.clone(),
                    chart: chart_root.join(&ctx.service),
                    values_file: self.values_dir.join(values_file),
                    image_repository: ctx.image_prefix(),
                    image_tag: ctx.image_tag().to_string(),
                };
                info!(
                    "Deploying release {} to namespace {} with image {}:{}",
                    request.release, request.namespace, request.image_repository, request.image_tag
                );
                self.toolchain
                    .deploy_release(&request)
                    .map_err(OperationError::DeploymentApply)?;
                Ok(ContextUpdate::new())
            }
        }
    }

    /// Reads the declared version from a package manifest
    ///
    /// A manifest without a `version` field keeps the caller-supplied version.
    fn read_version(&self, manifest: &str) -> Result<ContextUpdate> {
        let path = self.source_root.join(manifest);
        match read_manifest_version(&path)? {
            Some(version) => {
                info!("Resolved version {} from {}", version, path.display());
                Ok(ContextUpdate::new().with(VERSION, version))
            }
            None => {
                warn!("{} declares no version, keeping the caller-supplied one", path.display());
                Ok(ContextUpdate::new())
            }
        }
    }
}

impl OperationExecutor for StandardExecutor {
    fn execute(&self, spec: &OperationSpec, context: &ExecutionContext) -> ExecutionResult {
        let operation = spec.operation_type();
        debug!("Executing {} for service {}", operation, context.service);

        match self.dispatch(spec, context) {
            Ok(update) => ExecutionResult::success(update),
            Err(e @ OperationError::Analysis(_))
                if self.analysis_policy == AnalysisPolicy::Advisory =>
            {
                warn!("{} (advisory, continuing)", e);
                ExecutionResult::advisory(e.to_string())
            }
            Err(e) => ExecutionResult::failed(e.to_string()),
        }
    }
}

/// Reads the `version` field of a JSON package manifest
///
/// `Ok(None)` when the field is absent; a present but empty or non-string
/// version is a parse error.
pub fn read_manifest_version(path: &Path) -> Result<Option<String>> {
    let source = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => OperationError::ManifestNotFound {
            path: path.to_path_buf(),
        },
        _ => OperationError::ManifestParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let manifest: serde_json::Value =
        serde_json::from_str(&source).map_err(|e| OperationError::ManifestParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    match manifest.get("version") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(version)) if !version.trim().is_empty() => {
            Ok(Some(version.trim().to_string()))
        }
        Some(_) => Err(OperationError::ManifestParse {
            path: path.to_path_buf(),
            reason: "'version' must be a non-empty string".to_string(),
        }),
    }
}

//! Error types for pipeline operations

use rollout_core::domain::pipeline::OperationType;
use std::path::PathBuf;
use thiserror::Error;

use crate::toolchain::ToolFailure;

/// Result type alias for operation handlers
pub type Result<T> = std::result::Result<T, OperationError>;

/// Errors that fail a single operation
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Manifest not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("Failed to parse manifest {}: {reason}", path.display())]
    ManifestParse { path: PathBuf, reason: String },

    #[error("Dependency installation failed: {0}")]
    DependencyInstall(#[source] ToolFailure),

    #[error("Static analysis failed: {0}")]
    Analysis(#[source] ToolFailure),

    #[error("Image build failed: {0}")]
    ImageBuild(#[source] ToolFailure),

    #[error("Image push failed: {0}")]
    ImagePush(#[source] ToolFailure),

    #[error("Chart fetch failed: {0}")]
    ChartFetch(#[source] ToolFailure),

    #[error("Release deployment failed: {0}")]
    DeploymentApply(#[source] ToolFailure),

    /// A value an earlier operation should have provided is absent
    #[error("{operation} requires '{key}' in the execution context")]
    MissingContext {
        operation: OperationType,
        key: String,
    },
}

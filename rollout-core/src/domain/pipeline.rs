//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which of the two per-service pipelines a definition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Build,
    Deploy,
}

impl PipelineKind {
    /// Suffix used for the scheduler job name (`<service>-build`)
    pub fn job_suffix(&self) -> &'static str {
        match self {
            PipelineKind::Build => "build",
            PipelineKind::Deploy => "deploy",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Build => write!(f, "Build"),
            PipelineKind::Deploy => write!(f, "Deploy"),
        }
    }
}

impl std::str::FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "build" => Ok(PipelineKind::Build),
            "deploy" => Ok(PipelineKind::Deploy),
            other => Err(format!("unknown pipeline kind '{}'", other)),
        }
    }
}

/// Identity of an operation, independent of its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    ReadVersion,
    InstallDependencies,
    StaticAnalysis,
    BuildImage,
    PushImage,
    FetchHelmChart,
    DeployRelease,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::ReadVersion => "ReadVersion",
            OperationType::InstallDependencies => "InstallDependencies",
            OperationType::StaticAnalysis => "StaticAnalysis",
            OperationType::BuildImage => "BuildImage",
            OperationType::PushImage => "PushImage",
            OperationType::FetchHelmChart => "FetchHelmChart",
            OperationType::DeployRelease => "DeployRelease",
        };
        write!(f, "{}", name)
    }
}

/// Where DeployRelease takes the chart from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSource {
    /// Chart root configured on the runner
    Bundled,
    /// Chart root cloned earlier in the run by FetchHelmChart
    Fetched,
}

/// A single operation with its typed parameters
///
/// Paths are relative to the source root of the run. Values that only exist
/// at run time (version, project, registry) are read from the execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationSpec {
    ReadVersion {
        manifest: String,
    },
    InstallDependencies {
        service_dir: String,
    },
    StaticAnalysis {
        service_dir: String,
    },
    BuildImage {
        service_dir: String,
        dockerfile: String,
    },
    PushImage,
    FetchHelmChart {
        repository: String,
        branch: String,
    },
    DeployRelease {
        release: String,
        namespace: String,
        chart: ChartSource,
        values_file: String,
    },
}

impl OperationSpec {
    pub fn operation_type(&self) -> OperationType {
        match self {
            OperationSpec::ReadVersion { .. } => OperationType::ReadVersion,
            OperationSpec::InstallDependencies { .. } => OperationType::InstallDependencies,
            OperationSpec::StaticAnalysis { .. } => OperationType::StaticAnalysis,
            OperationSpec::BuildImage { .. } => OperationType::BuildImage,
            OperationSpec::PushImage => OperationType::PushImage,
            OperationSpec::FetchHelmChart { .. } => OperationType::FetchHelmChart,
            OperationSpec::DeployRelease { .. } => OperationType::DeployRelease,
        }
    }
}

/// Ordered list of operations for one service's build or deploy
///
/// Derived from a `ServiceRecord` on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub service_name: String,
    pub kind: PipelineKind,
    /// Values bound when the definition was generated (e.g. environment, version)
    pub parameters: BTreeMap<String, String>,
    pub operations: Vec<OperationSpec>,
}

impl PipelineDefinition {
    /// Operation types in execution order
    pub fn operation_types(&self) -> Vec<OperationType> {
        self.operations
            .iter()
            .map(OperationSpec::operation_type)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_spec_serializes_with_tag() {
        let spec = OperationSpec::FetchHelmChart {
            repository: "https://git.example.com/charts.git".to_string(),
            branch: "release".to_string(),
        };

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["operation"], "fetch_helm_chart");
        assert_eq!(value["branch"], "release");
        assert_eq!(spec.operation_type(), OperationType::FetchHelmChart);
    }

    #[test]
    fn test_pipeline_kind_parsing() {
        assert_eq!("Build".parse::<PipelineKind>(), Ok(PipelineKind::Build));
        assert_eq!("deploy".parse::<PipelineKind>(), Ok(PipelineKind::Deploy));
        assert!("release".parse::<PipelineKind>().is_err());
        assert_eq!(PipelineKind::Deploy.job_suffix(), "deploy");
    }
}

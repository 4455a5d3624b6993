//! Pipeline definition generator
//!
//! Derives, from one `ServiceRecord`, the ordered operations of its build and
//! deploy pipelines and the scheduler jobs that trigger them.
//!
//! Generation is pure: no filesystem or network access, and the same record
//! with the same call-time parameters always yields an equal result.

use rollout_core::domain::context::{ENVIRONMENT, VERSION};
use rollout_core::domain::pipeline::{
    ChartSource, OperationSpec, PipelineDefinition, PipelineKind,
};
use rollout_core::domain::service::ServiceRecord;
use rollout_core::dto::job::{JobRegistration, ParameterDefinition};
use std::collections::BTreeMap;

/// Manifest read by ReadVersion, relative to the service directory
pub const MANIFEST_FILE: &str = "package.json";

/// Dockerfile used by BuildImage, relative to the service directory
pub const DOCKERFILE: &str = "Dockerfile";

/// Environment offered by default when a job is triggered by hand
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Generate the build pipeline of a service
///
/// Always ReadVersion → InstallDependencies → StaticAnalysis → BuildImage → PushImage.
/// The version resolved by ReadVersion replaces the caller-supplied one for
/// every later operation.
pub fn generate_build(record: &ServiceRecord) -> PipelineDefinition {
    let service_dir = record.name.clone();

    PipelineDefinition {
        service_name: record.name.clone(),
        kind: PipelineKind::Build,
        parameters: BTreeMap::new(),
        operations: vec![
            OperationSpec::ReadVersion {
                manifest: format!("{}/{}", service_dir, MANIFEST_FILE),
            },
            OperationSpec::InstallDependencies {
                service_dir: service_dir.clone(),
            },
            OperationSpec::StaticAnalysis {
                service_dir: service_dir.clone(),
            },
            OperationSpec::BuildImage {
                dockerfile: format!("{}/{}", service_dir, DOCKERFILE),
                service_dir,
            },
            OperationSpec::PushImage,
        ],
    }
}

/// Generate the deploy pipeline of a service for one environment and version
///
/// FetchHelmChart is prepended when the record names a chart repository;
/// DeployRelease then takes the chart from the fetched root.
pub fn generate_deploy(record: &ServiceRecord, environment: &str, version: &str) -> PipelineDefinition {
    let mut parameters = BTreeMap::new();
    parameters.insert(ENVIRONMENT.to_string(), environment.to_string());
    parameters.insert(VERSION.to_string(), version.to_string());

    let mut operations = Vec::with_capacity(2);
    let chart = match record.helm_source() {
        Some((repository, branch)) => {
            operations.push(OperationSpec::FetchHelmChart {
                repository: repository.to_string(),
                branch: branch.to_string(),
            });
            ChartSource::Fetched
        }
        None => ChartSource::Bundled,
    };

    operations.push(OperationSpec::DeployRelease {
        release: record.name.clone(),
        namespace: environment.to_string(),
        chart,
        values_file: format!("{}-values.yaml", record.name),
    });

    PipelineDefinition {
        service_name: record.name.clone(),
        kind: PipelineKind::Deploy,
        parameters,
        operations,
    }
}

/// Derive the scheduler job that triggers one of the service's pipelines
pub fn job_registration(record: &ServiceRecord, kind: PipelineKind) -> JobRegistration {
    let (script_path, description, parameters) = match kind {
        PipelineKind::Build => (
            record.build_pipeline_path.clone(),
            format!("Build and push the {} image", record.name),
            vec![
                ParameterDefinition {
                    name: "ENVIRONMENT".to_string(),
                    description: "Target environment of the image".to_string(),
                    default: Some(DEFAULT_ENVIRONMENT.to_string()),
                },
                ParameterDefinition {
                    name: "VERSION".to_string(),
                    description: "Fallback version when the manifest declares none"
                        .to_string(),
                    default: Some("latest".to_string()),
                },
            ],
        ),
        PipelineKind::Deploy => (
            record.deploy_pipeline_path.clone(),
            format!("Deploy {} to the cluster", record.name),
            vec![
                ParameterDefinition {
                    name: "ENVIRONMENT".to_string(),
                    description: "Namespace to release into".to_string(),
                    default: Some(DEFAULT_ENVIRONMENT.to_string()),
                },
                ParameterDefinition {
                    name: "VERSION".to_string(),
                    description: "Image tag to deploy".to_string(),
                    default: None,
                },
            ],
        ),
    };

    let mut environment = BTreeMap::new();
    environment.insert("SERVICE".to_string(), record.name.clone());
    environment.insert("PIPELINE_KIND".to_string(), kind.job_suffix().to_string());

    JobRegistration {
        folder: record.target_folder.trim_matches('/').to_string(),
        name: format!("{}-{}", record.name, kind.job_suffix()),
        kind,
        description,
        repository: record.source_repository.clone(),
        branch: record.source_branch.clone(),
        script_path,
        parameters,
        environment,
    }
}

/// Both job registrations of a service, build first
pub fn job_registrations(record: &ServiceRecord) -> [JobRegistration; 2] {
    [
        job_registration(record, PipelineKind::Build),
        job_registration(record, PipelineKind::Deploy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::domain::pipeline::OperationType;

    fn record() -> ServiceRecord {
        ServiceRecord {
            name: "backend".to_string(),
            source_repository: "https://git.example.com/shop/backend.git".to_string(),
            source_branch: "main".to_string(),
            build_pipeline_path: "ci/build.groovy".to_string(),
            deploy_pipeline_path: "ci/deploy.groovy".to_string(),
            target_folder: "shop/services/".to_string(),
            helm_repository: None,
            helm_branch: None,
        }
    }

    #[test]
    fn test_build_pipeline_order() {
        let definition = generate_build(&record());

        assert_eq!(definition.kind, PipelineKind::Build);
        assert_eq!(
            definition.operation_types(),
            vec![
                OperationType::ReadVersion,
                OperationType::InstallDependencies,
                OperationType::StaticAnalysis,
                OperationType::BuildImage,
                OperationType::PushImage,
            ]
        );
        assert_eq!(
            definition.operations[0],
            OperationSpec::ReadVersion {
                manifest: "backend/package.json".to_string()
            }
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let record = record();
        assert_eq!(generate_build(&record), generate_build(&record));
        assert_eq!(
            generate_deploy(&record, "prod", "2.0.0"),
            generate_deploy(&record, "prod", "2.0.0")
        );
        assert_eq!(job_registrations(&record), job_registrations(&record));
    }

    #[test]
    fn test_deploy_with_bundled_chart() {
        let definition = generate_deploy(&record(), "staging", "1.4.0");

        assert_eq!(definition.operation_types(), vec![OperationType::DeployRelease]);
        assert_eq!(definition.parameters["environment"], "staging");
        assert_eq!(definition.parameters["version"], "1.4.0");
        assert_eq!(
            definition.operations[0],
            OperationSpec::DeployRelease {
                release: "backend".to_string(),
                namespace: "staging".to_string(),
                chart: ChartSource::Bundled,
                values_file: "backend-values.yaml".to_string(),
            }
        );
    }

    #[test]
    fn test_deploy_with_helm_repository_fetches_chart_first() {
        let mut record = record();
        record.helm_repository = Some("https://git.example.com/shop/charts.git".to_string());
        record.helm_branch = Some("release".to_string());

        let definition = generate_deploy(&record, "prod", "1.4.0");
        assert_eq!(
            definition.operation_types(),
            vec![OperationType::FetchHelmChart, OperationType::DeployRelease]
        );
        assert!(matches!(
            definition.operations[1],
            OperationSpec::DeployRelease {
                chart: ChartSource::Fetched,
                ..
            }
        ));
    }

    #[test]
    fn test_job_registrations() {
        let [build, deploy] = job_registrations(&record());

        assert_eq!(build.path(), "shop/services/backend-build");
        assert_eq!(build.script_path, "ci/build.groovy");
        assert_eq!(deploy.path(), "shop/services/backend-deploy");
        assert_eq!(deploy.script_path, "ci/deploy.groovy");
        assert_eq!(deploy.environment["PIPELINE_KIND"], "deploy");
        assert_eq!(deploy.parameters[1].default, None);
    }
}

//! Registry to scheduler reconciliation

use rollout_client::{Result, Scheduler};
use rollout_core::domain::service::ServiceRecord;
use rollout_core::dto::job::JobRegistration;
use rollout_core::dto::seed::{JobChange, SeedReport, ServiceOutcome};
use rollout_registry::job_registrations;
use tracing::{debug, info, warn};

/// Reconciles every registry entry with the scheduler
///
/// Services are handled one after the other. A scheduler failure stops only
/// the service it happened on; its outcome carries the error and whatever was
/// done before it.
pub async fn reconcile(services: &[ServiceRecord], scheduler: &dyn Scheduler) -> SeedReport {
    let mut report = SeedReport::default();

    for record in services {
        let outcome = reconcile_service(record, scheduler).await;
        match &outcome.error {
            Some(error) => warn!("Failed to reconcile {}: {}", record.name, error),
            None => info!(
                "Reconciled {}: {} created, {} updated, {} unchanged",
                record.name,
                outcome.created.len(),
                outcome.updated.len(),
                outcome.unchanged.len()
            ),
        }
        report.services.push(outcome);
    }

    report
}

/// Ensures the folders and both jobs of one service exist and are current
pub async fn reconcile_service(record: &ServiceRecord, scheduler: &dyn Scheduler) -> ServiceOutcome {
    let mut outcome = ServiceOutcome::new(&record.name);

    if let Err(e) = apply(record, scheduler, &mut outcome).await {
        if e.is_server_error() {
            warn!("Scheduler failed internally on {}, a rerun may succeed", record.name);
        }
        outcome.error = Some(e.to_string());
    }

    outcome
}

async fn apply(
    record: &ServiceRecord,
    scheduler: &dyn Scheduler,
    outcome: &mut ServiceOutcome,
) -> Result<()> {
    for folder in record.folder_paths() {
        if !scheduler.folder_exists(&folder).await? {
            scheduler.create_folder(&folder).await?;
            debug!("Created folder {}", folder);
            outcome.folders_created.push(folder);
        }
    }

    for registration in job_registrations(record) {
        let change = upsert(scheduler, &registration).await?;
        outcome.record(registration.path(), change);
    }

    Ok(())
}

async fn upsert(scheduler: &dyn Scheduler, registration: &JobRegistration) -> Result<JobChange> {
    let path = registration.path();

    match scheduler.get_job(&path).await? {
        Some(existing) if existing == *registration => {
            debug!("Job {} is up to date", path);
            Ok(JobChange::Unchanged)
        }
        Some(_) => {
            scheduler.put_job(registration).await?;
            info!("Updated job {}", path);
            Ok(JobChange::Updated)
        }
        None => {
            scheduler.put_job(registration).await?;
            info!("Created job {}", path);
            Ok(JobChange::Created)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_client::InMemoryScheduler;
    use rollout_core::domain::pipeline::PipelineKind;
    use std::collections::BTreeMap;

    fn service(name: &str, folder: &str) -> ServiceRecord {
        ServiceRecord {
            name: name.to_string(),
            source_repository: format!("git@example.com:shop/{}.git", name),
            source_branch: "main".to_string(),
            build_pipeline_path: "ci/build".to_string(),
            deploy_pipeline_path: "ci/deploy".to_string(),
            target_folder: folder.to_string(),
            helm_repository: None,
            helm_branch: None,
        }
    }

    fn unrelated_job() -> JobRegistration {
        JobRegistration {
            folder: "shop/services".to_string(),
            name: "legacy-nightly".to_string(),
            kind: PipelineKind::Build,
            description: "hand-made job".to_string(),
            repository: "git@example.com:shop/legacy.git".to_string(),
            branch: "master".to_string(),
            script_path: "Jenkinsfile".to_string(),
            parameters: Vec::new(),
            environment: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_fresh_scheduler_gets_folders_and_jobs() {
        let scheduler = InMemoryScheduler::new();
        let services = vec![
            service("api", "shop/services"),
            service("web", "shop/services"),
        ];

        let report = reconcile(&services, &scheduler).await;

        assert_eq!(report.created(), 4);
        assert_eq!(report.failed(), 0);
        assert_eq!(
            report.outcome("api").unwrap().folders_created,
            vec!["shop".to_string(), "shop/services".to_string()]
        );
        assert!(report.outcome("web").unwrap().folders_created.is_empty());

        let jobs = scheduler.jobs().await;
        assert!(jobs.contains_key("shop/services/api-build"));
        assert!(jobs.contains_key("shop/services/api-deploy"));
        assert!(jobs.contains_key("shop/services/web-build"));
        assert!(jobs.contains_key("shop/services/web-deploy"));
    }

    #[tokio::test]
    async fn test_second_run_changes_nothing() {
        let scheduler = InMemoryScheduler::new();
        let services = vec![service("api", "shop/services")];

        reconcile(&services, &scheduler).await;
        let writes = scheduler.writes().await;
        let report = reconcile(&services, &scheduler).await;

        assert_eq!(report.created(), 0);
        assert_eq!(report.updated(), 0);
        assert_eq!(report.unchanged(), 2);
        assert_eq!(scheduler.writes().await, writes);
    }

    #[tokio::test]
    async fn test_branch_change_updates_jobs() {
        let scheduler = InMemoryScheduler::new();
        let mut record = service("api", "shop/services");
        reconcile(std::slice::from_ref(&record), &scheduler).await;

        record.source_branch = "release/2.0".to_string();
        let report = reconcile(std::slice::from_ref(&record), &scheduler).await;

        assert_eq!(report.updated(), 2);
        assert_eq!(report.created(), 0);
        let jobs = scheduler.jobs().await;
        assert_eq!(jobs["shop/services/api-build"].branch, "release/2.0");
    }

    #[tokio::test]
    async fn test_scheduler_failure_is_isolated_to_its_service() {
        let scheduler = InMemoryScheduler::new().rejecting("broken");
        let services = vec![
            service("legacy", "broken/apps"),
            service("api", "shop/services"),
        ];

        let report = reconcile(&services, &scheduler).await;

        assert_eq!(report.failed(), 1);
        assert!(report.outcome("legacy").unwrap().is_failed());
        assert_eq!(report.outcome("api").unwrap().created.len(), 2);
        assert!(!report.outcome("api").unwrap().is_failed());
    }

    #[tokio::test]
    async fn test_unrelated_jobs_are_left_alone() {
        let scheduler = InMemoryScheduler::new().with_job(unrelated_job());
        let services = vec![service("api", "shop/services")];

        let report = reconcile(&services, &scheduler).await;

        assert!(report.outcome("api").unwrap().folders_created.is_empty());
        let jobs = scheduler.jobs().await;
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs["shop/services/legacy-nightly"], unrelated_job());
    }
}

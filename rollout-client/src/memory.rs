//! In-memory scheduler
//!
//! Behaves like the HTTP scheduler for folder and job bookkeeping. Used by
//! dry runs to show what reconciliation would change, and by tests.

use crate::Scheduler;
use crate::error::{Result, SchedulerError};
use async_trait::async_trait;
use rollout_core::dto::job::JobRegistration;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    folders: BTreeSet<String>,
    jobs: BTreeMap<String, JobRegistration>,
    writes: usize,
}

/// Scheduler that keeps folders and jobs in memory
#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    state: Mutex<State>,
    /// Folders under which every call fails
    rejected: BTreeSet<String>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-registers a folder and its parents
    pub fn with_folder(mut self, path: &str) -> Self {
        let state = self.state.get_mut();
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            state.folders.insert(current.clone());
        }
        self
    }

    /// Pre-registers a job without counting it as a write
    pub fn with_job(mut self, job: JobRegistration) -> Self {
        self = self.with_folder(&job.folder);
        self.state.get_mut().jobs.insert(job.path(), job);
        self
    }

    /// Makes every call touching `folder` or anything below it fail
    pub fn rejecting(mut self, folder: &str) -> Self {
        self.rejected.insert(folder.trim_matches('/').to_string());
        self
    }

    pub async fn folders(&self) -> Vec<String> {
        self.state.lock().await.folders.iter().cloned().collect()
    }

    pub async fn jobs(&self) -> BTreeMap<String, JobRegistration> {
        self.state.lock().await.jobs.clone()
    }

    /// Number of folder creations and job writes performed
    pub async fn writes(&self) -> usize {
        self.state.lock().await.writes
    }

    fn check(&self, path: &str) -> Result<()> {
        let path = path.trim_matches('/');
        let rejected = self
            .rejected
            .iter()
            .any(|folder| path == folder || path.starts_with(&format!("{}/", folder)));

        if rejected {
            Err(SchedulerError::api_error(500, format!("scheduler rejected {}", path)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn folder_exists(&self, path: &str) -> Result<bool> {
        self.check(path)?;
        Ok(self.state.lock().await.folders.contains(path.trim_matches('/')))
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        self.check(path)?;
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(SchedulerError::InvalidRequest(
                "folder path cannot be empty".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        if let Some((parent, _)) = path.rsplit_once('/')
            && !state.folders.contains(parent)
        {
            return Err(SchedulerError::api_error(
                404,
                format!("parent folder {} does not exist", parent),
            ));
        }

        state.folders.insert(path.to_string());
        state.writes += 1;
        Ok(())
    }

    async fn get_job(&self, path: &str) -> Result<Option<JobRegistration>> {
        self.check(path)?;
        Ok(self.state.lock().await.jobs.get(path.trim_matches('/')).cloned())
    }

    async fn put_job(&self, job: &JobRegistration) -> Result<()> {
        let path = job.path();
        self.check(&path)?;

        let mut state = self.state.lock().await;
        if !job.folder.trim_matches('/').is_empty()
            && !state.folders.contains(job.folder.trim_matches('/'))
        {
            return Err(SchedulerError::api_error(
                404,
                format!("folder {} does not exist", job.folder),
            ));
        }

        state.jobs.insert(path, job.clone());
        state.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::domain::pipeline::PipelineKind;

    fn job(folder: &str, name: &str) -> JobRegistration {
        JobRegistration {
            folder: folder.to_string(),
            name: name.to_string(),
            kind: PipelineKind::Build,
            description: String::new(),
            repository: "git@example.com:shop/api.git".to_string(),
            branch: "main".to_string(),
            script_path: "rollout-runner".to_string(),
            parameters: Vec::new(),
            environment: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_create_folder_requires_parent() {
        let scheduler = InMemoryScheduler::new();

        assert!(scheduler.create_folder("shop/services").await.is_err());
        scheduler.create_folder("shop").await.unwrap();
        scheduler.create_folder("shop/services").await.unwrap();

        assert!(scheduler.folder_exists("shop/services").await.unwrap());
        assert_eq!(scheduler.writes().await, 2);
    }

    #[tokio::test]
    async fn test_put_and_get_job() {
        let scheduler = InMemoryScheduler::new().with_folder("shop/services");

        assert!(scheduler.get_job("shop/services/api-build").await.unwrap().is_none());
        scheduler.put_job(&job("shop/services", "api-build")).await.unwrap();

        let stored = scheduler.get_job("shop/services/api-build").await.unwrap();
        assert_eq!(stored, Some(job("shop/services", "api-build")));
    }

    #[tokio::test]
    async fn test_put_job_into_missing_folder_fails() {
        let scheduler = InMemoryScheduler::new();
        let err = scheduler.put_job(&job("shop", "api-build")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rejected_folder_fails_every_call() {
        let scheduler = InMemoryScheduler::new()
            .with_job(job("broken", "api-build"))
            .rejecting("broken");

        assert!(scheduler.folder_exists("broken").await.is_err());
        assert!(scheduler.get_job("broken/api-build").await.is_err());
        assert!(scheduler.folder_exists("brokenness").await.is_ok());
    }
}

//! Rollout scheduler client
//!
//! The seed process registers jobs in an external job scheduler. This crate
//! holds the `Scheduler` seam it talks through, an HTTP implementation for the
//! real scheduler and an in-memory one for dry runs and tests.
//!
//! # Example
//!
//! ```no_run
//! use rollout_client::{Scheduler, SchedulerClient};
//!
//! #[tokio::main]
//! async fn main() -> rollout_client::Result<()> {
//!     let client = SchedulerClient::new("http://localhost:8080");
//!
//!     if !client.folder_exists("shop/services").await? {
//!         client.create_folder("shop/services").await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod folders;
mod jobs;
mod memory;

// Re-export commonly used types
pub use error::{Result, SchedulerError};
pub use memory::InMemoryScheduler;
pub use rollout_core::dto::job::JobRegistration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Folder and job operations the seed process needs from a scheduler
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Whether a folder exists at `path` (`a/b/c`)
    async fn folder_exists(&self, path: &str) -> Result<bool>;

    /// Creates the folder at `path`; the parent must already exist
    async fn create_folder(&self, path: &str) -> Result<()>;

    /// Looks up the job at `path`, `None` when absent
    async fn get_job(&self, path: &str) -> Result<Option<JobRegistration>>;

    /// Creates or replaces the job at the registration's path
    async fn put_job(&self, job: &JobRegistration) -> Result<()>;
}

/// HTTP client for the scheduler API
#[derive(Debug, Clone)]
pub struct SchedulerClient {
    /// Base URL of the scheduler (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl SchedulerClient {
    /// Create a new scheduler client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new scheduler client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the scheduler
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str, path: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, endpoint, path.trim_matches('/'))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SchedulerError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| SchedulerError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SchedulerError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[async_trait]
impl Scheduler for SchedulerClient {
    async fn folder_exists(&self, path: &str) -> Result<bool> {
        self.fetch_folder(path).await
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        self.post_folder(path).await
    }

    async fn get_job(&self, path: &str) -> Result<Option<JobRegistration>> {
        self.fetch_job(path).await
    }

    async fn put_job(&self, job: &JobRegistration) -> Result<()> {
        self.store_job(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = SchedulerClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_urls_use_hierarchical_paths() {
        let client = SchedulerClient::new("http://scheduler:8080");
        assert_eq!(
            client.url("jobs", "/shop/services/api-build"),
            "http://scheduler:8080/api/jobs/shop/services/api-build"
        );
        assert_eq!(
            client.url("folders", "shop/"),
            "http://scheduler:8080/api/folders/shop"
        );
    }
}

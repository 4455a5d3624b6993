//! Folder endpoints

use crate::SchedulerClient;
use crate::error::{Result, SchedulerError};
use rollout_core::dto::job::CreateFolder;
use tracing::debug;

impl SchedulerClient {
    /// `GET /api/folders/{path}`, a 404 meaning the folder is absent
    pub(crate) async fn fetch_folder(&self, path: &str) -> Result<bool> {
        let response = self.client.get(self.url("folders", path)).send().await?;

        match self.handle_empty_response(response).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `POST /api/folders`
    pub(crate) async fn post_folder(&self, path: &str) -> Result<()> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(SchedulerError::InvalidRequest(
                "folder path cannot be empty".to_string(),
            ));
        }

        debug!("Creating folder {}", path);
        let url = format!("{}/api/folders", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateFolder {
                path: path.to_string(),
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}

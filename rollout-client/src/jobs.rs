//! Job endpoints

use crate::SchedulerClient;
use crate::error::{Result, SchedulerError};
use rollout_core::dto::job::JobRegistration;
use tracing::debug;

impl SchedulerClient {
    /// `GET /api/jobs/{path}`, a 404 meaning the job is absent
    pub(crate) async fn fetch_job(&self, path: &str) -> Result<Option<JobRegistration>> {
        let response = self.client.get(self.url("jobs", path)).send().await?;

        match self.handle_response(response).await {
            Ok(job) => Ok(Some(job)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `PUT /api/jobs/{path}`, creating or replacing the job
    pub(crate) async fn store_job(&self, job: &JobRegistration) -> Result<()> {
        if job.name.trim().is_empty() {
            return Err(SchedulerError::InvalidRequest(
                "job name cannot be empty".to_string(),
            ));
        }

        let path = job.path();
        debug!("Registering job {}", path);
        let response = self
            .client
            .put(self.url("jobs", &path))
            .json(job)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use crate::{Scheduler, SchedulerClient};
    use rollout_core::domain::pipeline::PipelineKind;
    use rollout_core::dto::job::{JobRegistration, ParameterDefinition};
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job() -> JobRegistration {
        JobRegistration {
            folder: "shop/services".to_string(),
            name: "api-build".to_string(),
            kind: PipelineKind::Build,
            description: "Build and push the api image".to_string(),
            repository: "git@example.com:shop/api.git".to_string(),
            branch: "main".to_string(),
            script_path: "ci/build.groovy".to_string(),
            parameters: vec![ParameterDefinition {
                name: "ENVIRONMENT".to_string(),
                description: "Target environment of the image".to_string(),
                default: Some("dev".to_string()),
            }],
            environment: BTreeMap::from([("SERVICE".to_string(), "api".to_string())]),
        }
    }

    #[tokio::test]
    async fn test_get_existing_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/shop/services/api-build"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job()))
            .mount(&server)
            .await;

        let client = SchedulerClient::new(server.uri());
        let found = client.get_job("shop/services/api-build").await.unwrap();

        assert_eq!(found, Some(job()));
    }

    #[tokio::test]
    async fn test_missing_job_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/shop/services/api-build"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such job"))
            .mount(&server)
            .await;

        let client = SchedulerClient::new(server.uri());

        assert_eq!(client.get_job("shop/services/api-build").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_job_server_error_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = SchedulerClient::new(server.uri());
        let err = client.get_job("shop/services/api-build").await.unwrap_err();

        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn test_put_job_sends_registration() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/jobs/shop/services/api-build"))
            .and(body_json(job()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = SchedulerClient::new(server.uri());

        client.put_job(&job()).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_job_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/jobs/shop/services/api-build"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let client = SchedulerClient::new(server.uri());
        let err = client.put_job(&job()).await.unwrap_err();

        assert!(err.is_server_error());
        assert!(err.to_string().contains("disk full"));
    }
}

//! reqwest-backed coordinator client.
//!
//! Endpoints:
//! - `POST /v1/edge/register` with the capability descriptor
//! - `GET  /v1/edge/jobs?supported_types=a,b`
//! - `POST /v1/edge/jobs/{id}/claim`
//! - `POST /v1/edge/jobs/{id}/result`

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use edgeloop_core::{CapabilityDescriptor, CoordinatorConfig, Job, JobResult, JobType};

use crate::client::{JobCoordinatorClient, RegistrationOutcome};
use crate::error::CoordinatorError;

/// Coordinator client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCoordinatorClient {
    base_url: String,
    /// Parsed form of `base_url`, used to build per-job paths.
    base: reqwest::Url,
    api_token: Option<String>,
    /// Shared HTTP client (connection pooling).
    http: reqwest::Client,
}

impl HttpCoordinatorClient {
    pub fn new(config: &CoordinatorConfig) -> Result<Self, CoordinatorError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = reqwest::Url::parse(&base_url)
            .map_err(|e| CoordinatorError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(CoordinatorError::InvalidUrl(base_url));
        }
        Ok(Self {
            base_url,
            base,
            api_token: config.api_token.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base}/v1/edge/jobs/{job_id}/{action}`. The id is pushed as a single
    /// percent-encoded segment, so `/`, `?` and `#` stay inside it.
    fn job_url(&self, job_id: &str, action: &str) -> reqwest::Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "edge", "jobs", job_id, action]);
        }
        url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, CoordinatorError> {
        let resp = self.authorize(req).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "coordinator request failed");
        Err(CoordinatorError::from_status(status.as_u16()))
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, CoordinatorError> {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| CoordinatorError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl JobCoordinatorClient for HttpCoordinatorClient {
    async fn register(
        &self,
        capabilities: &CapabilityDescriptor,
    ) -> Result<RegistrationOutcome, CoordinatorError> {
        let req = self.http.post(self.url("/v1/edge/register")).json(capabilities);
        match self.send(req).await {
            Ok(_) => {
                info!(device_id = %capabilities.device_id, "registered with coordinator");
                Ok(RegistrationOutcome::Registered)
            }
            Err(CoordinatorError::Conflict) => {
                info!(device_id = %capabilities.device_id, "device already registered");
                Ok(RegistrationOutcome::AlreadyRegistered)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_jobs(&self, supported: &[JobType]) -> Result<Vec<Job>, CoordinatorError> {
        let types = supported
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let req = self
            .http
            .get(self.url("/v1/edge/jobs"))
            .query(&[("supported_types", types)]);
        let jobs: Vec<Job> = Self::decode(self.send(req).await?).await?;
        debug!(count = jobs.len(), "fetched jobs");
        Ok(jobs)
    }

    async fn claim_job(&self, job_id: &str) -> Result<Job, CoordinatorError> {
        let req = self.http.post(self.job_url(job_id, "claim"));
        let job: Job = Self::decode(self.send(req).await?).await?;
        if job.id != job_id {
            return Err(CoordinatorError::InvalidResponse(format!(
                "claimed job {job_id} but coordinator returned {}",
                job.id
            )));
        }
        Ok(job)
    }

    async fn submit_result(&self, result: &JobResult) -> Result<(), CoordinatorError> {
        let req = self
            .http
            .post(self.job_url(&result.job_id, "result"))
            .json(result);
        self.send(req).await?;
        Ok(())
    }
}

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SubmitError;
use crate::partition::WorkBatch;

/// Where and how download jobs are queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSpec {
    pub queue:    String,
    pub priority: u8,
    pub job_name: String,
    pub job_type: String,
    pub tags:     Vec<String>,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            queue:    "granary-job_worker-small".to_string(),
            priority: 0,
            job_name: "granary-download".to_string(),
            job_type: "job-granary_download:latest".to_string(),
            tags:     vec!["granary".to_string()],
        }
    }
}

/// Run-wide values copied into every batch's job parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchParams {
    pub bucket_name: String,
    pub start_time:  Option<String>,
    pub end_time:    Option<String>,
}

#[derive(Debug, Serialize)]
struct JobParams<'a> {
    tile_ids:    String,
    bucket_name: &'a str,
    start_time:  Option<&'a str>,
    end_time:    Option<&'a str>,
    batch_id:    String,
}

/// A job ready to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub batch_id: String,
    pub queue:    String,
    pub priority: u8,
    pub job_name: String,
    pub job_type: String,
    pub tags:     Vec<String>,
    /// JSON-encoded job parameters.
    pub params:   String,
}

impl JobRequest {
    pub fn for_batch(spec: &JobSpec, batch: &WorkBatch, params: &BatchParams) -> Result<Self, SubmitError> {
        let batch_id = batch.id.to_string();
        let job_params = JobParams {
            tile_ids:    batch.tile_ids.join(" "),
            bucket_name: &params.bucket_name,
            start_time:  params.start_time.as_deref(),
            end_time:    params.end_time.as_deref(),
            batch_id:    batch_id.clone(),
        };
        Ok(Self {
            batch_id,
            queue: spec.queue.clone(),
            priority: spec.priority,
            job_name: format!("{}-{}", spec.job_name, batch.id),
            job_type: spec.job_type.clone(),
            tags: spec.tags.clone(),
            params: serde_json::to_string(&job_params)?,
        })
    }

    fn form(&self) -> Result<Vec<(&'static str, String)>, SubmitError> {
        Ok(vec![
            ("queue", self.queue.clone()),
            ("priority", self.priority.to_string()),
            ("job_name", self.job_name.clone()),
            ("tags", serde_json::to_string(&self.tags)?),
            ("type", self.job_type.clone()),
            ("params", self.params.clone()),
        ])
    }
}

/// Job-queue backend.
///
/// # Implementations
///
/// - [`HttpJobSubmitter`]: form POST to a job-queue REST endpoint
/// - Mock implementations for testing
pub trait JobSubmitter: Send + Sync {
    /// Queue `request`, returning the job id.
    fn submit(&self, request: &JobRequest) -> impl Future<Output = Result<String, SubmitError>> + Send;
}

#[derive(Deserialize)]
struct SubmitResponse {
    success: bool,
    #[serde(default)]
    result:  Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn parse_submit_response(body: &str) -> Result<String, SubmitError> {
    let response: SubmitResponse = serde_json::from_str(body)?;
    match (response.success, response.result) {
        (true, Some(job_id)) => Ok(job_id),
        (_, result) => Err(SubmitError::Rejected {
            message: response.message.or(result).unwrap_or_else(|| "no message".to_string()),
        }),
    }
}

pub struct HttpJobSubmitter {
    http: reqwest::Client,
    url:  String,
}

impl HttpJobSubmitter {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self { Self { http, url: url.into() } }
}

impl JobSubmitter for HttpJobSubmitter {
    async fn submit(&self, request: &JobRequest) -> Result<String, SubmitError> {
        let response = self.http.post(&self.url).form(&request.form()?).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let job_id = parse_submit_response(&body)?;
        debug!(batch_id = %request.batch_id, job_id = %job_id, "job queued");
        Ok(job_id)
    }
}

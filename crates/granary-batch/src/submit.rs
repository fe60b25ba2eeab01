//! Concurrent job submission.
//!
//! Every batch is submitted in its own task; a semaphore bounds how many
//! are in flight. Results are gathered once every task has finished and a
//! failed submission never cancels its siblings.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::error::SubmitError;
use crate::job::{BatchParams, JobRequest, JobSpec, JobSubmitter};
use crate::partition::WorkBatch;

/// Outcome of one submission pass.
#[derive(Debug, Default)]
pub struct SubmissionReport {
    /// `(batch id, job id)` per queued batch.
    pub succeeded: Vec<(String, String)>,
    /// `(batch id, error)` per batch that could not be queued.
    pub failed:    Vec<(String, SubmitError)>,
}

impl SubmissionReport {
    pub fn total(&self) -> usize { self.succeeded.len() + self.failed.len() }

    pub fn is_success(&self) -> bool { self.failed.is_empty() }
}

/// Submit one job per batch, at most `concurrency` at a time.
pub async fn submit_all<S>(
    submitter: Arc<S>,
    spec: &JobSpec,
    batches: &[WorkBatch],
    params: &BatchParams,
    concurrency: usize,
) -> SubmissionReport
where
    S: JobSubmitter + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut futures = FuturesUnordered::new();
    let mut report = SubmissionReport::default();

    for batch in batches {
        let request = match JobRequest::for_batch(spec, batch, params) {
            Ok(request) => request,
            Err(e) => {
                report.failed.push((batch.id.to_string(), e));
                continue;
            }
        };
        let submitter = Arc::clone(&submitter);
        let semaphore = Arc::clone(&semaphore);
        let batch_id = request.batch_id.clone();

        let task = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| SubmitError::Task(e.to_string()))?;
            submitter.submit(&request).await
        });
        futures.push(async move { (batch_id, task.await) });
    }

    while let Some((batch_id, joined)) = futures.next().await {
        let result = joined.unwrap_or_else(|e| Err(SubmitError::Task(e.to_string())));
        match result {
            Ok(job_id) => {
                info!(batch_id = %batch_id, job_id = %job_id, "batch submitted");
                report.succeeded.push((batch_id, job_id));
            }
            Err(e) => {
                error!(batch_id = %batch_id, error = %e, "batch submission failed");
                report.failed.push((batch_id, e));
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "job submission finished"
    );
    report
}

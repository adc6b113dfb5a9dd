//! Status polling until a batch job reaches a terminal state.

use std::time::Duration;

use serde_json::json;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument};

use crate::domain::errors::{BatchError, BatchResult};
use crate::domain::models::{BatchJob, BatchStatus, CompletedJob};
use crate::services::reconciler::read_error_detail;
use crate::services::resilient_api::ResilientBatchApi;

/// How long and how often to wait for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// When false, a non-terminal job is an error instead of a reason to sleep.
    pub wait: bool,
    /// Sleep between status reads.
    pub poll_interval: Duration,
    /// Budget for this job's poll loop only.
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            wait: true,
            poll_interval: Duration::from_millis(2_000),
            timeout: Duration::from_secs(60 * 60),
        }
    }
}

/// Poll `batch_id` until it completes, fails, or the options give up on it.
///
/// `initial` is used as the first observation so a create response that is
/// already terminal costs no extra round trip.
///
/// # Returns
/// * `Ok(CompletedJob)` - Job completed with an output file
/// * `Err(BatchError::MissingOutputFile)` - Completed but no output file id
/// * `Err(BatchError::JobFailed)` - Job failed, expired or was cancelled
/// * `Err(BatchError::WaitDisabled)` - Not terminal and waiting is off
/// * `Err(BatchError::Timeout)` - Still running after `options.timeout`
#[instrument(skip(api, initial, options), fields(wait = options.wait))]
pub async fn wait_for_completion(
    api: &ResilientBatchApi,
    batch_id: &str,
    initial: Option<BatchJob>,
    options: &PollOptions,
) -> BatchResult<CompletedJob> {
    let started = Instant::now();
    let mut current = initial;

    loop {
        let job = match current.take() {
            Some(job) => job,
            None => api.retrieve_batch(batch_id).await?,
        };
        let state = job.status_label().to_string();

        match job.state() {
            BatchStatus::Completed => {
                let output_file_id = job
                    .output_file_id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| BatchError::MissingOutputFile {
                        batch_id: batch_id.to_string(),
                    })?;
                debug!(batch_id, %output_file_id, "batch job completed");
                return Ok(CompletedJob {
                    batch_id: batch_id.to_string(),
                    output_file_id,
                    error_file_id: job.error_file_id.filter(|id| !id.is_empty()),
                });
            }
            status if status.is_failure() => {
                let detail = match job.error_file_id.as_deref().filter(|id| !id.is_empty()) {
                    Some(file_id) => read_error_detail(api, file_id).await,
                    None => job.first_error_message().map(str::to_string),
                };
                return Err(BatchError::JobFailed {
                    batch_id: batch_id.to_string(),
                    status: state,
                    detail,
                });
            }
            _ => {}
        }

        if !options.wait {
            return Err(BatchError::WaitDisabled {
                batch_id: batch_id.to_string(),
                status: state,
            });
        }
        if started.elapsed() > options.timeout {
            return Err(BatchError::Timeout {
                batch_id: batch_id.to_string(),
                timeout: options.timeout,
            });
        }

        let interval_ms = options.poll_interval.as_millis();
        api.diagnostics().record(
            &format!("batch {batch_id} {state}; waiting {interval_ms}ms"),
            json!({ "batchId": batch_id, "status": state }),
        );
        sleep(options.poll_interval).await;
    }
}

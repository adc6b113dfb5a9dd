//! Upload-then-create submission of one batch group.

use std::collections::HashMap;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::errors::{BatchError, BatchResult};
use crate::domain::models::{BatchGroup, BatchJob, CreateBatchRequest};
use crate::services::resilient_api::ResilientBatchApi;

/// Job parameters shared by every group of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSpec {
    /// Endpoint the job runs against (e.g. `/v1/embeddings`)
    pub endpoint: String,
    /// Provider completion window (e.g. `24h`)
    pub completion_window: String,
    /// Logical source label, also used as the upload file name prefix
    pub source: String,
    /// Agent / tenant identifier
    pub agent_id: String,
}

impl SubmissionSpec {
    fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            ("source".to_string(), self.source.clone()),
            ("agent".to_string(), self.agent_id.clone()),
        ])
    }

    fn file_name(&self) -> String {
        format!("{}.{}.jsonl", self.source, Uuid::new_v4().simple())
    }
}

/// A job the provider accepted, with its id already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    /// Provider batch id, known to be non-empty
    pub batch_id: String,
    /// The create response, reused as the first status observation.
    pub job: BatchJob,
}

fn non_empty(id: Option<String>) -> Option<String> {
    id.filter(|id| !id.is_empty())
}

/// Upload `group` as a JSONL file and start a batch job over it.
///
/// # Returns
/// * `Ok(SubmittedJob)` - The job was created
/// * `Err(BatchError::MissingFileId)` / `Err(BatchError::MissingBatchId)` - Provider omitted an id
/// * `Err(BatchError)` - Upload or create failed after retries
#[instrument(skip_all, fields(group = group.index, requests = group.len()))]
pub async fn submit_group(
    api: &ResilientBatchApi,
    group: &BatchGroup,
    spec: &SubmissionSpec,
) -> BatchResult<SubmittedJob> {
    let jsonl = group.to_jsonl().map_err(|e| BatchError::Decode {
        operation: "file upload".to_string(),
        message: e.to_string(),
    })?;

    let file_name = spec.file_name();
    let file = api.upload_file(&file_name, &jsonl).await?;
    let input_file_id = non_empty(file.id).ok_or(BatchError::MissingFileId)?;
    debug!(file_id = %input_file_id, %file_name, "batch input uploaded");

    let request = CreateBatchRequest {
        input_file_id,
        endpoint: spec.endpoint.clone(),
        completion_window: spec.completion_window.clone(),
        metadata: spec.metadata(),
    };
    let job = api.create_batch(&request).await?;
    let batch_id = non_empty(job.id.clone()).ok_or(BatchError::MissingBatchId)?;

    info!(%batch_id, status = job.status_label(), "batch job created");
    Ok(SubmittedJob { batch_id, job })
}

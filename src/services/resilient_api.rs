//! Retrying facade over a [`BatchApi`] transport.

use std::sync::Arc;

use crate::domain::errors::BatchResult;
use crate::domain::models::{BatchJob, CreateBatchRequest, FileObject};
use crate::domain::ports::{BatchApi, Diagnostics};
use crate::services::retry::RetryPolicy;

/// Every provider call used by the engine, each passed through the retry policy.
#[derive(Clone)]
pub struct ResilientBatchApi {
    api: Arc<dyn BatchApi>,
    retry: RetryPolicy,
    diagnostics: Diagnostics,
}

impl ResilientBatchApi {
    /// Wrap `api` with `retry`, reporting to `diagnostics`.
    pub fn new(api: Arc<dyn BatchApi>, retry: RetryPolicy, diagnostics: Diagnostics) -> Self {
        Self {
            api,
            retry,
            diagnostics,
        }
    }

    /// Sink shared with the retry policy.
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Policy applied to every call.
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Upload a JSONL batch file.
    pub async fn upload_file(&self, file_name: &str, jsonl: &str) -> BatchResult<FileObject> {
        self.retry
            .execute("file upload", &self.diagnostics, || {
                self.api.upload_file(file_name, jsonl)
            })
            .await
    }

    /// Create a batch job.
    pub async fn create_batch(&self, request: &CreateBatchRequest) -> BatchResult<BatchJob> {
        self.retry
            .execute("create", &self.diagnostics, || self.api.create_batch(request))
            .await
    }

    /// Read a job's current state.
    pub async fn retrieve_batch(&self, batch_id: &str) -> BatchResult<BatchJob> {
        self.retry
            .execute("status", &self.diagnostics, || {
                self.api.retrieve_batch(batch_id)
            })
            .await
    }

    /// Download an output or error file.
    pub async fn file_content(&self, file_id: &str) -> BatchResult<String> {
        self.retry
            .execute("file content", &self.diagnostics, || {
                self.api.file_content(file_id)
            })
            .await
    }
}

impl std::fmt::Debug for ResilientBatchApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientBatchApi")
            .field("retry", &self.retry)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

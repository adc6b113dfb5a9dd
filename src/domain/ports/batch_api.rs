//! Batch API port.
//!
//! Defines the four provider calls the engine needs. Implementations perform
//! exactly one attempt per call; retrying is the caller's concern.

use async_trait::async_trait;

use crate::domain::errors::BatchResult;
use crate::domain::models::{BatchJob, CreateBatchRequest, FileObject};

/// Transport to a remote batch embedding provider.
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Upload a newline-delimited JSON batch input file with purpose `batch`.
    ///
    /// # Arguments
    /// * `file_name` - Name reported to the provider for the uploaded file
    /// * `jsonl` - File content, one request per line
    ///
    /// # Returns
    /// * `Ok(FileObject)` - Provider file object (the id may be absent on a bad response)
    /// * `Err(BatchError)` - HTTP, transport or decode failure
    async fn upload_file(&self, file_name: &str, jsonl: &str) -> BatchResult<FileObject>;

    /// Start a batch job over a previously uploaded file.
    async fn create_batch(&self, request: &CreateBatchRequest) -> BatchResult<BatchJob>;

    /// Read the current state of a batch job.
    async fn retrieve_batch(&self, batch_id: &str) -> BatchResult<BatchJob>;

    /// Download the raw content of an output or error file.
    async fn file_content(&self, file_id: &str) -> BatchResult<String>;
}

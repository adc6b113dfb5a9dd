//! In-memory batch provider for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::errors::{BatchError, BatchResult};
use crate::domain::models::{
    BatchJob, BatchJobErrorEntry, BatchJobErrors, BatchRequest, CreateBatchRequest, FileObject,
};
use crate::domain::ports::BatchApi;

/// Operation label for file uploads, as counted by [`MockBatchApi::calls`].
pub const OP_UPLOAD: &str = "file upload";
/// Operation label for job creation.
pub const OP_CREATE: &str = "create";
/// Operation label for status reads.
pub const OP_STATUS: &str = "status";
/// Operation label for file downloads.
pub const OP_CONTENT: &str = "file content";

/// Scripted provider behavior.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Status reads before a job turns terminal; 0 makes the create response terminal
    pub polls_until_complete: u32,
    /// Terminal status reached by every job
    pub terminal_status: String,
    /// Items answered with a 400 line in the error file (id -> message)
    pub failing_ids: HashMap<String, String>,
    /// Items left out of the output entirely
    pub omitted_ids: HashSet<String>,
    /// Leading create calls answered with 503
    pub transient_create_failures: u32,
    /// Delay added to every call
    pub latency: Duration,
    /// Error file message attached to jobs that end in a failure status
    pub failure_detail: Option<String>,
    /// Answer uploads without a file id
    pub omit_file_id: bool,
    /// Answer creates without a batch id
    pub omit_batch_id: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            polls_until_complete: 1,
            terminal_status: "completed".to_string(),
            failing_ids: HashMap::new(),
            omitted_ids: HashSet::new(),
            transient_create_failures: 0,
            latency: Duration::ZERO,
            failure_detail: None,
            omit_file_id: false,
            omit_batch_id: false,
        }
    }
}

#[derive(Debug)]
struct MockBatch {
    input_file_id: String,
    polls: u32,
    job: BatchJob,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: usize,
    files: HashMap<String, String>,
    uploads: Vec<String>,
    output_files: HashSet<String>,
    batches: HashMap<String, MockBatch>,
    created: Vec<CreateBatchRequest>,
    calls: HashMap<&'static str, usize>,
    active_jobs: usize,
    max_active_jobs: usize,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn count(&mut self, operation: &'static str) -> usize {
        let calls = self.calls.entry(operation).or_default();
        *calls += 1;
        *calls
    }
}

/// Provider double that stores uploads in memory and answers every input
/// line with a three-dimensional vector `[position + 1, 0, 0]`.
///
/// A job is "active" from its upload until its output file is read, which
/// lets tests observe how many jobs were in flight at once.
#[derive(Debug, Default)]
pub struct MockBatchApi {
    behavior: MockBehavior,
    state: Mutex<MockState>,
}

impl MockBatchApi {
    /// Create a provider that follows `behavior`.
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        if !self.behavior.latency.is_zero() {
            tokio::time::sleep(self.behavior.latency).await;
        }
    }

    /// Number of calls made for one operation (see the `OP_*` constants).
    pub fn calls(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or(0)
    }

    /// Highest number of jobs in flight at any time.
    pub fn max_active_jobs(&self) -> usize {
        self.state().max_active_jobs
    }

    /// Store a file directly, bypassing upload accounting.
    pub fn insert_file(&self, file_id: &str, content: &str) {
        self.state()
            .files
            .insert(file_id.to_string(), content.to_string());
    }

    /// Every request line uploaded so far, in upload order.
    pub fn uploaded_requests(&self) -> Vec<BatchRequest> {
        self.state()
            .uploads
            .iter()
            .flat_map(|content| content.lines())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Create requests received so far.
    pub fn created_batches(&self) -> Vec<CreateBatchRequest> {
        self.state().created.clone()
    }

    /// Move a job to its terminal status, writing output and error files.
    fn finish(&self, state: &mut MockState, batch_id: &str) {
        let Some(input_file_id) = state.batches.get(batch_id).map(|b| b.input_file_id.clone())
        else {
            return;
        };
        let requests: Vec<BatchRequest> = state
            .files
            .get(&input_file_id)
            .map(|content| {
                content
                    .lines()
                    .filter_map(|line| serde_json::from_str(line).ok())
                    .collect()
            })
            .unwrap_or_default();

        let status = self.behavior.terminal_status.clone();
        let mut output_file_id = None;
        let mut error_file_id = None;

        if status == "completed" {
            let mut output = Vec::new();
            let mut errors = Vec::new();
            for (position, request) in requests.iter().enumerate() {
                let id = &request.custom_id;
                if self.behavior.omitted_ids.contains(id) {
                    continue;
                }
                if let Some(message) = self.behavior.failing_ids.get(id) {
                    errors.push(json!({
                        "custom_id": id,
                        "response": {"status_code": 400, "body": {"error": {"message": message}}},
                    }));
                    continue;
                }
                output.push(json!({
                    "custom_id": id,
                    "response": {
                        "status_code": 200,
                        "body": {"data": [{"index": 0, "embedding": [position as f64 + 1.0, 0.0, 0.0]}]},
                    },
                }));
            }

            let file_id = state.next_id("file-out");
            state.files.insert(file_id.clone(), join_lines(&output));
            state.output_files.insert(file_id.clone());
            output_file_id = Some(file_id);

            if !errors.is_empty() {
                let file_id = state.next_id("file-err");
                state.files.insert(file_id.clone(), join_lines(&errors));
                error_file_id = Some(file_id);
            }
        } else if let Some(detail) = &self.behavior.failure_detail {
            let file_id = state.next_id("file-err");
            let line = json!({"custom_id": null, "error": {"message": detail}});
            state.files.insert(file_id.clone(), line.to_string());
            error_file_id = Some(file_id);
        }

        if let Some(batch) = state.batches.get_mut(batch_id) {
            batch.job.status = Some(status);
            batch.job.output_file_id = output_file_id;
            batch.job.error_file_id = error_file_id;
        }
    }
}

fn join_lines(lines: &[serde_json::Value]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn not_found(operation: &str, what: &str) -> BatchError {
    BatchError::Http {
        operation: operation.to_string(),
        status: 404,
        body: json!({"error": {"message": format!("No such {what}")}}).to_string(),
    }
}

#[async_trait]
impl BatchApi for MockBatchApi {
    async fn upload_file(&self, _file_name: &str, jsonl: &str) -> BatchResult<FileObject> {
        self.delay().await;
        let mut state = self.state();
        state.count(OP_UPLOAD);
        state.active_jobs += 1;
        state.max_active_jobs = state.max_active_jobs.max(state.active_jobs);

        let file_id = state.next_id("file-in");
        state.files.insert(file_id.clone(), jsonl.to_string());
        state.uploads.push(jsonl.to_string());
        Ok(FileObject {
            id: (!self.behavior.omit_file_id).then_some(file_id),
        })
    }

    async fn create_batch(&self, request: &CreateBatchRequest) -> BatchResult<BatchJob> {
        self.delay().await;
        let mut state = self.state();
        let attempt = state.count(OP_CREATE);
        if attempt <= self.behavior.transient_create_failures as usize {
            return Err(BatchError::Http {
                operation: OP_CREATE.to_string(),
                status: 503,
                body: "upstream connect error".to_string(),
            });
        }
        if !state.files.contains_key(&request.input_file_id) {
            return Err(not_found(OP_CREATE, "file"));
        }

        state.created.push(request.clone());
        let batch_id = state.next_id("batch");
        let job = BatchJob {
            id: Some(batch_id.clone()),
            status: Some("validating".to_string()),
            ..BatchJob::default()
        };
        state.batches.insert(
            batch_id.clone(),
            MockBatch {
                input_file_id: request.input_file_id.clone(),
                polls: 0,
                job,
            },
        );
        if self.behavior.polls_until_complete == 0 {
            self.finish(&mut state, &batch_id);
        }

        let mut job = state
            .batches
            .get(&batch_id)
            .map(|b| b.job.clone())
            .unwrap_or_default();
        if self.behavior.omit_batch_id {
            job.id = None;
        }
        Ok(job)
    }

    async fn retrieve_batch(&self, batch_id: &str) -> BatchResult<BatchJob> {
        self.delay().await;
        let mut state = self.state();
        state.count(OP_STATUS);

        let polls = {
            let batch = state
                .batches
                .get_mut(batch_id)
                .ok_or_else(|| not_found(OP_STATUS, "batch"))?;
            batch.polls += 1;
            if !batch.job.state().is_terminal() {
                batch.job.status = Some("in_progress".to_string());
            }
            batch.polls
        };
        if polls >= self.behavior.polls_until_complete {
            let terminal = state
                .batches
                .get(batch_id)
                .is_some_and(|b| b.job.state().is_terminal());
            if !terminal {
                self.finish(&mut state, batch_id);
            }
        }

        let mut job = state
            .batches
            .get(batch_id)
            .map(|b| b.job.clone())
            .unwrap_or_default();
        if job.state().is_failure() && job.error_file_id.is_none() {
            job.errors = self.behavior.failure_detail.as_ref().map(|detail| BatchJobErrors {
                data: vec![BatchJobErrorEntry {
                    message: Some(detail.clone()),
                    ..BatchJobErrorEntry::default()
                }],
            });
        }
        Ok(job)
    }

    async fn file_content(&self, file_id: &str) -> BatchResult<String> {
        self.delay().await;
        let mut state = self.state();
        state.count(OP_CONTENT);

        let content = state
            .files
            .get(file_id)
            .cloned()
            .ok_or_else(|| not_found(OP_CONTENT, "file"))?;
        if state.output_files.remove(file_id) {
            state.active_jobs = state.active_jobs.saturating_sub(1);
        }
        Ok(content)
    }
}

//! The batch embedding engine.

pub mod batch_runner;
pub mod orchestrator;
pub mod poller;
pub mod reconciler;
pub mod resilient_api;
pub mod retry;
pub mod splitter;
pub mod submitter;

pub use batch_runner::{BatchRunOptions, EmbeddingBatchRunner};
pub use orchestrator::run_with_concurrency;
pub use poller::{wait_for_completion, PollOptions};
pub use reconciler::{fetch_group_results, parse_output, read_error_detail, reconcile};
pub use resilient_api::ResilientBatchApi;
pub use retry::RetryPolicy;
pub use splitter::{build_requests, ensure_unique_ids, split_requests, MAX_REQUESTS_PER_JOB};
pub use submitter::{submit_group, SubmissionSpec, SubmittedJob};

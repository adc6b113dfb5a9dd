//! End-to-end embedding run: split, then submit, poll and reconcile each
//! group on a bounded worker pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{info, instrument};

use crate::domain::errors::{BatchError, BatchResult};
use crate::domain::models::{BatchGroup, Config, EmbeddingItem, COMPLETION_WINDOW};
use crate::domain::ports::{BatchApi, Diagnostics};
use crate::services::orchestrator::run_with_concurrency;
use crate::services::poller::{wait_for_completion, PollOptions};
use crate::services::reconciler::fetch_group_results;
use crate::services::resilient_api::ResilientBatchApi;
use crate::services::retry::RetryPolicy;
use crate::services::splitter::{
    build_requests, ensure_unique_ids, split_requests, MAX_REQUESTS_PER_JOB,
};
use crate::services::submitter::{submit_group, SubmissionSpec};

/// Per-run parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRunOptions {
    /// Embedding model identifier
    pub model: String,
    /// Endpoint path placed on every request line
    pub endpoint: String,
    /// Poll until each job finishes; otherwise fail on a running job
    pub wait: bool,
    /// Delay between status reads
    pub poll_interval: Duration,
    /// Applies to each job's poll loop separately.
    pub timeout: Duration,
    /// Maximum jobs in flight
    pub concurrency: usize,
    /// Requests per job, capped at [`MAX_REQUESTS_PER_JOB`]
    pub max_requests_per_job: usize,
    /// Provider completion window
    pub completion_window: String,
    /// Source label for job metadata and file names
    pub source: String,
    /// Agent id for job metadata
    pub agent_id: String,
}

impl Default for BatchRunOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BatchRunOptions {
    /// Options taken from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let batch = &config.batch;
        Self {
            model: config.provider.model.clone(),
            endpoint: batch.endpoint.clone(),
            wait: batch.wait,
            poll_interval: Duration::from_millis(batch.poll_interval_ms),
            timeout: Duration::from_secs(batch.timeout_minutes.saturating_mul(60)),
            concurrency: batch.concurrency,
            max_requests_per_job: batch.max_requests_per_job,
            completion_window: COMPLETION_WINDOW.to_string(),
            source: batch.source.clone(),
            agent_id: batch.agent_id.clone(),
        }
    }

    fn validate(&self) -> BatchResult<()> {
        if self.model.trim().is_empty() {
            return Err(BatchError::InvalidOptions("model must not be empty".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(BatchError::InvalidOptions("endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    fn poll_options(&self) -> PollOptions {
        PollOptions {
            wait: self.wait,
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        }
    }

    fn submission(&self) -> SubmissionSpec {
        SubmissionSpec {
            endpoint: self.endpoint.clone(),
            completion_window: self.completion_window.clone(),
            source: self.source.clone(),
            agent_id: self.agent_id.clone(),
        }
    }
}

/// Embeds items through the provider's asynchronous batch API.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use embatch::adapters::openai::OpenAiBatchClient;
/// use embatch::domain::models::{Config, EmbeddingItem};
/// use embatch::domain::ports::Diagnostics;
/// use embatch::services::{BatchRunOptions, EmbeddingBatchRunner, RetryPolicy};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::default();
/// let client = OpenAiBatchClient::with_config(&config.provider)?;
/// let runner = EmbeddingBatchRunner::new(
///     Arc::new(client),
///     RetryPolicy::from_config(&config.retry),
///     Diagnostics::none(),
///     BatchRunOptions::from_config(&config),
/// );
///
/// let vectors = runner.run(&[EmbeddingItem::new("doc-1", "hello world")]).await?;
/// println!("{} vectors", vectors.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EmbeddingBatchRunner {
    api: ResilientBatchApi,
    options: BatchRunOptions,
}

impl EmbeddingBatchRunner {
    /// Create a runner over `api`; every call goes through `retry`.
    pub fn new(
        api: Arc<dyn BatchApi>,
        retry: RetryPolicy,
        diagnostics: Diagnostics,
        options: BatchRunOptions,
    ) -> Self {
        Self {
            api: ResilientBatchApi::new(api, retry, diagnostics),
            options,
        }
    }

    /// The retrying provider facade the runner submits through.
    pub const fn api(&self) -> &ResilientBatchApi {
        &self.api
    }

    /// Options this runner was built with.
    pub const fn options(&self) -> &BatchRunOptions {
        &self.options
    }

    /// Embed `items`, returning one vector per item id.
    ///
    /// The mapping is returned only when every group succeeded; otherwise the
    /// first group failure is returned and partial results are discarded.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn run(&self, items: &[EmbeddingItem]) -> BatchResult<HashMap<String, Vec<f32>>> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }
        self.options.validate()?;
        ensure_unique_ids(items)?;

        let requests = build_requests(items, &self.options.model, &self.options.endpoint);
        let max_per_job = self.options.max_requests_per_job.min(MAX_REQUESTS_PER_JOB);
        let groups = split_requests(requests, max_per_job);

        self.api.diagnostics().record(
            "embedding batch submit",
            json!({
                "requests": items.len(),
                "groups": groups.len(),
                "wait": self.options.wait,
                "concurrency": self.options.concurrency,
                "pollIntervalMs": self.options.poll_interval.as_millis() as u64,
                "timeoutMs": self.options.timeout.as_millis() as u64,
            }),
        );

        let total = groups.len();
        let groups = groups.as_slice();
        let per_group = run_with_concurrency(total, self.options.concurrency, move |index| {
            self.run_group(&groups[index], total)
        })
        .await?;

        let mut merged = HashMap::with_capacity(items.len());
        for embeddings in per_group {
            merged.extend(embeddings);
        }

        info!(vectors = merged.len(), groups = total, "embedding batch run complete");
        Ok(merged)
    }

    async fn run_group(
        &self,
        group: &BatchGroup,
        total_groups: usize,
    ) -> BatchResult<HashMap<String, Vec<f32>>> {
        let submitted = submit_group(&self.api, group, &self.options.submission()).await?;

        self.api.diagnostics().record(
            "embedding batch created",
            json!({
                "batchId": submitted.batch_id,
                "status": submitted.job.status_label(),
                "group": group.index + 1,
                "groups": total_groups,
                "requests": group.len(),
            }),
        );

        let completed = wait_for_completion(
            &self.api,
            &submitted.batch_id,
            Some(submitted.job),
            &self.options.poll_options(),
        )
        .await?;

        fetch_group_results(&self.api, &completed, group).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockBatchApi, MockBehavior, OP_CREATE, OP_UPLOAD};
    use serde_json::Value;
    use std::sync::Mutex;

    fn items(n: usize) -> Vec<EmbeddingItem> {
        (0..n)
            .map(|i| EmbeddingItem::new(format!("chunk-{i}"), format!("text {i}")))
            .collect()
    }

    fn options() -> BatchRunOptions {
        BatchRunOptions {
            poll_interval: Duration::from_millis(50),
            timeout: Duration::from_secs(10),
            ..BatchRunOptions::default()
        }
    }

    fn runner(mock: &Arc<MockBatchApi>, options: BatchRunOptions) -> EmbeddingBatchRunner {
        EmbeddingBatchRunner::new(
            Arc::clone(mock) as _,
            RetryPolicy::new(3, 10, 50, 0.0),
            Diagnostics::none(),
            options,
        )
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.batch.timeout_minutes = 2;
        config.batch.concurrency = 4;
        config.provider.model = "text-embedding-3-large".to_string();

        let options = BatchRunOptions::from_config(&config);
        assert_eq!(options.timeout, Duration::from_secs(120));
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.model, "text-embedding-3-large");
        assert_eq!(options.completion_window, "24h");
        assert_eq!(options.endpoint, "/v1/embeddings");
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior::default()));
        let result = runner(&mock, options()).run(&[]).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(mock.calls(OP_UPLOAD), 0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected_before_upload() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior::default()));
        let mut input = items(2);
        input.push(EmbeddingItem::new("chunk-0", "again"));

        let err = runner(&mock, options()).run(&input).await.unwrap_err();
        assert!(matches!(err, BatchError::DuplicateItemId(_)));
        assert_eq!(mock.calls(OP_UPLOAD), 0);
    }

    #[tokio::test]
    async fn test_empty_model_rejected() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior::default()));
        let options = BatchRunOptions {
            model: " ".to_string(),
            ..options()
        };

        let err = runner(&mock, options).run(&items(1)).await.unwrap_err();
        assert!(matches!(err, BatchError::InvalidOptions(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_groups_respect_concurrency_limit() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior {
            polls_until_complete: 2,
            latency: Duration::from_millis(20),
            ..MockBehavior::default()
        }));
        let options = BatchRunOptions {
            concurrency: 2,
            max_requests_per_job: 2,
            ..options()
        };

        let result = runner(&mock, options).run(&items(9)).await.unwrap();

        assert_eq!(result.len(), 9);
        assert!(result.values().all(|v| v.len() == 3));
        assert_eq!(mock.calls(OP_UPLOAD), 5);
        assert_eq!(mock.calls(OP_CREATE), 5);
        assert!(mock.max_active_jobs() <= 2, "peak {}", mock.max_active_jobs());
        assert!(mock.max_active_jobs() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_create_failure_is_retried() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior {
            transient_create_failures: 1,
            ..MockBehavior::default()
        }));

        let result = runner(&mock, options()).run(&items(3)).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(mock.calls(OP_CREATE), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_failure_fails_run() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior {
            failing_ids: HashMap::from([("chunk-1".to_string(), "input too long".to_string())]),
            ..MockBehavior::default()
        }));

        let err = runner(&mock, options()).run(&items(3)).await.unwrap_err();
        assert!(matches!(err, BatchError::ItemErrors { .. }));
        assert!(err.to_string().ends_with("failed: chunk-1: input too long"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_item_fails_run() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior {
            omitted_ids: ["chunk-2".to_string()].into(),
            ..MockBehavior::default()
        }));

        let err = runner(&mock, options()).run(&items(3)).await.unwrap_err();
        assert!(err.to_string().ends_with("missing 1 embedding responses"));
        assert_eq!(err.failed_ids(), vec!["chunk-2"]);
    }

    #[tokio::test]
    async fn test_wait_disabled_surfaces_error() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior::default()));
        let options = BatchRunOptions {
            wait: false,
            ..options()
        };

        let err = runner(&mock, options).run(&items(2)).await.unwrap_err();
        assert!(matches!(err, BatchError::WaitDisabled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostics_record_submit_and_create() {
        let mock = Arc::new(MockBatchApi::new(MockBehavior::default()));
        let messages: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&messages);
        let diagnostics = Diagnostics::new(Arc::new(move |message: &str, context: &Value| {
            captured
                .lock()
                .unwrap()
                .push((message.to_string(), context.clone()));
        }));
        let runner = EmbeddingBatchRunner::new(
            Arc::clone(&mock) as _,
            RetryPolicy::default(),
            diagnostics,
            options(),
        );

        runner.run(&items(2)).await.unwrap();

        let messages = messages.lock().unwrap();
        let submit = messages
            .iter()
            .find(|(m, _)| m == "embedding batch submit")
            .unwrap();
        assert_eq!(submit.1["requests"], 2);
        assert_eq!(submit.1["groups"], 1);

        let created = messages
            .iter()
            .find(|(m, _)| m == "embedding batch created")
            .unwrap();
        assert_eq!(created.1["group"], 1);
        assert_eq!(created.1["requests"], 2);
    }
}

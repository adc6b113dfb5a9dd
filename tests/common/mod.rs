//! Common test utilities for integration tests
//!
//! Fixtures for driving the engine against a mockito provider.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use embatch::domain::models::ProviderConfig;
use embatch::{
    BatchRunOptions, Diagnostics, EmbeddingBatchRunner, EmbeddingItem, OpenAiBatchClient,
    RetryPolicy,
};
use serde_json::json;

pub const TEST_API_KEY: &str = "sk-test";

/// Provider configuration pointing at a mock server
pub fn provider(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        base_url: base_url.to_string(),
        api_key: Some(TEST_API_KEY.to_string()),
        timeout_secs: 5,
        ..ProviderConfig::default()
    }
}

/// Run options with short delays
pub fn fast_options() -> BatchRunOptions {
    BatchRunOptions {
        poll_interval: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
        concurrency: 2,
        ..BatchRunOptions::default()
    }
}

/// Retry policy with millisecond backoff and no jitter
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, 5, 20, 0.0)
}

pub fn runner(base_url: &str, options: BatchRunOptions) -> EmbeddingBatchRunner {
    let client = OpenAiBatchClient::with_config(&provider(base_url)).expect("client");
    EmbeddingBatchRunner::new(Arc::new(client), fast_retry(), Diagnostics::none(), options)
}

pub fn items(ids: &[&str]) -> Vec<EmbeddingItem> {
    ids.iter()
        .map(|id| EmbeddingItem::new(*id, format!("text for {id}")))
        .collect()
}

/// One successful output line
pub fn success_line(id: &str, embedding: &[f32]) -> String {
    json!({
        "id": format!("req_{id}"),
        "custom_id": id,
        "response": {
            "status_code": 200,
            "body": {"data": [{"embedding": embedding, "index": 0}]}
        },
        "error": null
    })
    .to_string()
}

/// One output line carrying an item-level error
pub fn error_line(id: &str, status_code: u16, message: &str) -> String {
    json!({
        "custom_id": id,
        "response": {
            "status_code": status_code,
            "body": {"error": {"message": message}}
        }
    })
    .to_string()
}

pub fn jsonl(lines: &[String]) -> String {
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

pub fn batch_body(id: &str, status: &str) -> String {
    json!({"id": id, "object": "batch", "status": status}).to_string()
}

pub fn completed_body(id: &str, output_file_id: &str) -> String {
    json!({
        "id": id,
        "object": "batch",
        "status": "completed",
        "output_file_id": output_file_id
    })
    .to_string()
}

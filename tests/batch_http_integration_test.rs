//! Integration tests for the embedding engine over HTTP
//!
//! Drive `EmbeddingBatchRunner` through `OpenAiBatchClient` against a mockito
//! server that speaks the provider's batch protocol.

mod common;

use common::*;
use embatch::BatchError;
use mockito::{Matcher, Server};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_embeds_items_end_to_end() {
    let mut server = Server::new_async().await;
    let upload = server
        .mock("POST", "/files")
        .match_header("authorization", format!("Bearer {TEST_API_KEY}").as_str())
        .match_body(Matcher::Regex("text-embedding-3-small".to_string()))
        .with_status(200)
        .with_body(r#"{"id":"file-in","object":"file","purpose":"batch"}"#)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/batches")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "input_file_id": "file-in",
            "endpoint": "/v1/embeddings",
            "completion_window": "24h"
        })))
        .with_status(200)
        .with_body(batch_body("batch_1", "validating"))
        .create_async()
        .await;
    let status = server
        .mock("GET", "/batches/batch_1")
        .with_status(200)
        .with_body(completed_body("batch_1", "file-out"))
        .expect_at_least(1)
        .create_async()
        .await;
    let content = server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body(jsonl(&[
            success_line("b", &[0.0, 1.0]),
            success_line("a", &[1.0, 0.0]),
        ]))
        .create_async()
        .await;

    let runner = runner(&server.url(), fast_options());
    let vectors = assert_ok!(runner.run(&items(&["a", "b"])).await);

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors["a"], vec![1.0, 0.0]);
    assert_eq!(vectors["b"], vec![0.0, 1.0]);

    upload.assert_async().await;
    create.assert_async().await;
    status.assert_async().await;
    content.assert_async().await;
}

#[tokio::test]
async fn test_create_retried_after_service_unavailable() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/files")
        .with_status(200)
        .with_body(r#"{"id":"file-in"}"#)
        .create_async()
        .await;
    let unavailable = server
        .mock("POST", "/batches")
        .with_status(503)
        .with_body("upstream overloaded")
        .expect(1)
        .create_async()
        .await;
    let created = server
        .mock("POST", "/batches")
        .with_status(200)
        .with_body(completed_body("batch_1", "file-out"))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body(jsonl(&[success_line("a", &[0.25])]))
        .create_async()
        .await;

    let runner = runner(&server.url(), fast_options());
    let vectors = assert_ok!(runner.run(&items(&["a"])).await);

    assert_eq!(vectors["a"], vec![0.25]);
    unavailable.assert_async().await;
    created.assert_async().await;
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mut server = Server::new_async().await;
    let upload = server
        .mock("POST", "/files")
        .with_status(404)
        .with_body(r#"{"error":{"message":"no such route"}}"#)
        .expect(1)
        .create_async()
        .await;

    let runner = runner(&server.url(), fast_options());
    let err = assert_err!(runner.run(&items(&["a"])).await);

    match &err {
        BatchError::Http { operation, status, .. } => {
            assert_eq!(operation, "file upload");
            assert_eq!(*status, 404);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retryable());
    upload.assert_async().await;
}

#[tokio::test]
async fn test_item_errors_fail_the_run() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/files")
        .with_status(200)
        .with_body(r#"{"id":"file-in"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/batches")
        .with_status(200)
        .with_body(completed_body("batch_1", "file-out"))
        .create_async()
        .await;
    server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body(jsonl(&[
            success_line("a", &[1.0]),
            error_line("b", 400, "input too long"),
        ]))
        .create_async()
        .await;

    let runner = runner(&server.url(), fast_options());
    let err = assert_err!(runner.run(&items(&["a", "b"])).await);

    assert!(matches!(err, BatchError::ItemErrors { .. }), "{err}");
    assert_eq!(err.failed_ids(), vec!["b"]);
    assert_eq!(err.to_string(), "batch batch_1 failed: b: input too long");
}

#[tokio::test]
async fn test_error_file_lines_are_merged() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/files")
        .with_status(200)
        .with_body(r#"{"id":"file-in"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/batches")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "id": "batch_1",
                "status": "completed",
                "output_file_id": "file-out",
                "error_file_id": "file-err"
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body(jsonl(&[success_line("a", &[1.0])]))
        .create_async()
        .await;
    let errors = server
        .mock("GET", "/files/file-err/content")
        .with_status(200)
        .with_body(jsonl(&[error_line("b", 400, "unsupported input")]))
        .create_async()
        .await;

    let runner = runner(&server.url(), fast_options());
    let err = assert_err!(runner.run(&items(&["a", "b"])).await);

    assert_eq!(err.failed_ids(), vec!["b"]);
    assert!(err.to_string().contains("unsupported input"), "{err}");
    errors.assert_async().await;
}

#[tokio::test]
async fn test_missing_responses_fail_the_run() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/files")
        .with_status(200)
        .with_body(r#"{"id":"file-in"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/batches")
        .with_status(200)
        .with_body(completed_body("batch_1", "file-out"))
        .create_async()
        .await;
    server
        .mock("GET", "/files/file-out/content")
        .with_status(200)
        .with_body(jsonl(&[success_line("a", &[1.0])]))
        .create_async()
        .await;

    let runner = runner(&server.url(), fast_options());
    let err = assert_err!(runner.run(&items(&["a", "b", "c"])).await);

    assert_eq!(err.to_string(), "batch batch_1 missing 2 embedding responses");
    assert_eq!(err.failed_ids(), vec!["b", "c"]);
}

#[tokio::test]
async fn test_wait_disabled_does_not_poll() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/files")
        .with_status(200)
        .with_body(r#"{"id":"file-in"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/batches")
        .with_status(200)
        .with_body(batch_body("batch_1", "in_progress"))
        .create_async()
        .await;
    let status = server
        .mock("GET", "/batches/batch_1")
        .expect(0)
        .create_async()
        .await;

    let options = embatch::BatchRunOptions {
        wait: false,
        ..fast_options()
    };
    let runner = runner(&server.url(), options);
    let err = assert_err!(runner.run(&items(&["a"])).await);

    assert!(
        matches!(&err, BatchError::WaitDisabled { batch_id, status } if batch_id == "batch_1" && status == "in_progress"),
        "{err}"
    );
    status.assert_async().await;
}

#[tokio::test]
async fn test_failed_job_reports_error_file_detail() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/files")
        .with_status(200)
        .with_body(r#"{"id":"file-in"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/batches")
        .with_status(200)
        .with_body(batch_body("batch_1", "validating"))
        .create_async()
        .await;
    server
        .mock("GET", "/batches/batch_1")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "id": "batch_1",
                "status": "failed",
                "error_file_id": "file-err"
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/files/file-err/content")
        .with_status(200)
        .with_body(jsonl(&[serde_json::json!({
            "custom_id": "a",
            "error": {"message": "quota exceeded", "code": "billing"}
        })
        .to_string()]))
        .create_async()
        .await;

    let runner = runner(&server.url(), fast_options());
    let err = assert_err!(runner.run(&items(&["a"])).await);

    assert_eq!(err.to_string(), "batch batch_1 failed: quota exceeded");
    assert_eq!(err.batch_id(), Some("batch_1"));
}

#[tokio::test]
async fn test_empty_input_makes_no_requests() {
    let mut server = Server::new_async().await;
    let any = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let runner = runner(&server.url(), fast_options());
    let vectors = assert_ok!(runner.run(&[]).await);

    assert!(vectors.is_empty());
    any.assert_async().await;
}

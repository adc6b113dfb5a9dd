//! reqwest transport for the OpenAI-compatible files and batches API.

use std::error::Error as StdError;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::domain::errors::{BatchError, BatchResult, TransportKind};
use crate::domain::models::{BatchJob, CreateBatchRequest, FileObject, ProviderConfig};
use crate::domain::ports::BatchApi;

/// MIME type of uploaded batch input files.
const JSONL_CONTENT_TYPE: &str = "application/jsonl";

/// HTTP client for the OpenAI-compatible files and batches endpoints
///
/// Features:
/// - Connection pooling and reuse (via reqwest::Client)
/// - Bearer authentication plus any configured extra headers
/// - Status and transport failures mapped to classified [`BatchError`]s
///
/// Retries live one layer up, in the resilient wrapper; every method here
/// issues exactly one request.
#[derive(Debug, Clone)]
pub struct OpenAiBatchClient {
    http_client: ReqwestClient,
    base_url: String,
}

impl OpenAiBatchClient {
    /// Create a client from provider configuration
    ///
    /// # Arguments
    /// * `config` - Provider settings; the API key falls back to `OPENAI_API_KEY`
    ///
    /// # Returns
    /// * `Ok(OpenAiBatchClient)` - Client ready to use
    /// * `Err(anyhow::Error)` - No API key, an invalid header, or the HTTP client failed to build
    pub fn with_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .context("OpenAI API key not set. Set OPENAI_API_KEY or provider.api_key")?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("API key is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name: {name}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {name}"))?;
            headers.insert(name, value);
        }

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL with any trailing `/` removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fail on non-2xx, carrying the response body text.
    async fn check_status(operation: &str, response: Response) -> BatchResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        Err(BatchError::Http {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> BatchResult<T> {
        let response = Self::check_status(operation, response).await?;
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(operation, &e))?;
        serde_json::from_str(&text).map_err(|e| BatchError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }
}

/// Classify a reqwest failure and flatten its source chain into one message.
fn transport_error(operation: &str, error: &reqwest::Error) -> BatchError {
    let kind = if error.is_timeout() {
        TransportKind::Timeout
    } else if error.is_connect() {
        TransportKind::Connect
    } else {
        TransportKind::Other
    };

    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    BatchError::Transport {
        operation: operation.to_string(),
        kind,
        message,
    }
}

#[async_trait]
impl BatchApi for OpenAiBatchClient {
    #[instrument(skip(self, jsonl), fields(bytes = jsonl.len()))]
    async fn upload_file(&self, file_name: &str, jsonl: &str) -> BatchResult<FileObject> {
        let operation = "file upload";
        let part = Part::text(jsonl.to_string())
            .file_name(file_name.to_string())
            .mime_str(JSONL_CONTENT_TYPE)
            .map_err(|e| transport_error(operation, &e))?;
        let form = Form::new().text("purpose", "batch").part("file", part);

        let response = self
            .http_client
            .post(self.url("/files"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        Self::decode(operation, response).await
    }

    #[instrument(skip(self, request), fields(input_file_id = %request.input_file_id))]
    async fn create_batch(&self, request: &CreateBatchRequest) -> BatchResult<BatchJob> {
        let operation = "create";
        let response = self
            .http_client
            .post(self.url("/batches"))
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        Self::decode(operation, response).await
    }

    #[instrument(skip(self))]
    async fn retrieve_batch(&self, batch_id: &str) -> BatchResult<BatchJob> {
        let operation = "status";
        let response = self
            .http_client
            .get(self.url(&format!("/batches/{batch_id}")))
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        let job: BatchJob = Self::decode(operation, response).await?;
        debug!(batch_id, status = job.status_label(), "batch status");
        Ok(job)
    }

    #[instrument(skip(self))]
    async fn file_content(&self, file_id: &str) -> BatchResult<String> {
        let operation = "file content";
        let response = self
            .http_client
            .get(self.url(&format!("/files/{file_id}/content")))
            .send()
            .await
            .map_err(|e| transport_error(operation, &e))?;

        Self::check_status(operation, response)
            .await?
            .text()
            .await
            .map_err(|e| transport_error(operation, &e))
    }
}

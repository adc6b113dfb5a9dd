//! Embedding items and the batch request lines derived from them.

use serde::{Deserialize, Serialize};

/// HTTP method recorded on every batch request line.
pub const BATCH_REQUEST_METHOD: &str = "POST";

/// Default endpoint embedded in request lines and job creation.
pub const EMBEDDINGS_ENDPOINT: &str = "/v1/embeddings";

/// A unit of text that needs an embedding vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingItem {
    /// Unique caller-assigned id, used as the batch `custom_id`.
    pub id: String,
    /// Text to embed.
    pub text: String,
}

impl EmbeddingItem {
    /// Create an item.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Body of one embeddings call inside a batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequestBody {
    /// Embedding model identifier
    pub model: String,
    /// Text to embed
    pub input: String,
}

/// One line of the uploaded batch input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// The item id, echoed back in output lines
    pub custom_id: String,
    /// Always `POST`
    pub method: String,
    /// Endpoint path, e.g. `/v1/embeddings`
    pub url: String,
    /// Embeddings request body
    pub body: BatchRequestBody,
}

impl BatchRequest {
    /// Build the request line for `item`.
    pub fn for_item(item: &EmbeddingItem, model: &str, endpoint: &str) -> Self {
        Self {
            custom_id: item.id.clone(),
            method: BATCH_REQUEST_METHOD.to_string(),
            url: endpoint.to_string(),
            body: BatchRequestBody {
                model: model.to_string(),
                input: item.text.clone(),
            },
        }
    }
}

/// A size-bounded run of requests submitted together as one batch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchGroup {
    /// Zero-based position of the group in submission order.
    pub index: usize,
    /// Request lines in input order
    pub requests: Vec<BatchRequest>,
}

impl BatchGroup {
    /// Number of requests in the group.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// True when the group holds no requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Custom ids in submission order.
    pub fn custom_ids(&self) -> impl Iterator<Item = &str> {
        self.requests.iter().map(|r| r.custom_id.as_str())
    }

    /// Serialize the group as newline-delimited JSON.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let lines = self
            .requests
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    }
}

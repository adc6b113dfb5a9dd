//! Lines of a batch output or error file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw `{custom_id, response | error}` line as written by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Item id the line answers
    #[serde(default)]
    pub custom_id: Option<String>,
    /// Embeddings response, when the request ran
    #[serde(default)]
    pub response: Option<OutputResponse>,
    /// Request-level failure
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// HTTP response recorded for one request line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputResponse {
    /// HTTP status of the embeddings call
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Either an embeddings payload, an `{error}` object or a bare string.
    #[serde(default)]
    pub body: Option<Value>,
}

/// Provider error object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Provider error code
    #[serde(default)]
    pub code: Option<String>,
}

impl OutputLine {
    /// Top-level `error.message`, if any.
    pub fn top_level_error(&self) -> Option<&str> {
        self.error.as_ref()?.message.as_deref()
    }

    /// `response.body.error.message`, if any.
    pub fn body_error(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .body
            .as_ref()?
            .get("error")?
            .get("message")?
            .as_str()
    }

    fn status_code(&self) -> u16 {
        self.response
            .as_ref()
            .and_then(|r| r.status_code)
            .unwrap_or(0)
    }

    /// First vector in `response.body.data`, empty when absent.
    ///
    /// Fails with the item message when any entry is not a number.
    fn first_embedding(&self) -> Result<Vec<f32>, &'static str> {
        let Some(first) = self
            .response
            .as_ref()
            .and_then(|r| r.body.as_ref())
            .and_then(|b| b.get("data"))
            .and_then(Value::as_array)
            .and_then(|data| data.first())
        else {
            return Ok(Vec::new());
        };

        let Some(values) = first.get("embedding").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|v| v.as_f64().map(|v| v as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or("invalid embedding value")
    }

    /// Interpret the line. Returns `None` for lines without a `custom_id`.
    pub fn into_record(self) -> Option<OutputRecord> {
        let custom_id = self.custom_id.clone()?;

        if let Some(message) = self.top_level_error() {
            return Some(OutputRecord::failure(custom_id, message));
        }

        if self.status_code() >= 400 {
            let message = self
                .body_error()
                .map(str::to_string)
                .or_else(|| {
                    self.response
                        .as_ref()
                        .and_then(|r| r.body.as_ref())
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "unknown error".to_string());
            return Some(OutputRecord::failure(custom_id, message));
        }

        let embedding = match self.first_embedding() {
            Ok(embedding) => embedding,
            Err(message) => return Some(OutputRecord::failure(custom_id, message)),
        };
        if embedding.is_empty() {
            return Some(OutputRecord::failure(custom_id, "empty embedding"));
        }

        Some(OutputRecord {
            custom_id,
            outcome: OutputOutcome::Embedding(embedding),
        })
    }
}

/// What the provider produced for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputOutcome {
    /// The extracted vector
    Embedding(Vec<f32>),
    /// Item-level error message
    Error(String),
}

/// One interpreted output line.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    /// Item id
    pub custom_id: String,
    /// Vector or error
    pub outcome: OutputOutcome,
}

impl OutputRecord {
    fn failure(custom_id: String, message: impl Into<String>) -> Self {
        Self {
            custom_id,
            outcome: OutputOutcome::Error(message.into()),
        }
    }

    /// True when the line produced a vector.
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, OutputOutcome::Embedding(_))
    }
}

//! Provider-side batch job state.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Completion window requested for every job.
pub const COMPLETION_WINDOW: &str = "24h";

/// Lifecycle state of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Accepted but not yet running (`validating`, `queued`).
    Queued,
    /// Running or wrapping up (`in_progress`, `finalizing`, `cancelling`).
    InProgress,
    /// `completed`
    Completed,
    /// `failed`
    Failed,
    /// `expired`
    Expired,
    /// `cancelled` or `canceled`.
    Cancelled,
    /// Missing or unrecognised status string.
    Unknown,
}

impl BatchStatus {
    /// Map a provider status string.
    pub fn from_wire(status: Option<&str>) -> Self {
        match status {
            Some("validating" | "queued") => Self::Queued,
            Some("in_progress" | "finalizing" | "cancelling") => Self::InProgress,
            Some("completed") => Self::Completed,
            Some("failed") => Self::Failed,
            Some("expired") => Self::Expired,
            Some("cancelled" | "canceled") => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    /// True for states from which no further transition occurs.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Expired | Self::Cancelled
        )
    }

    /// True for terminal states other than `completed`.
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Expired | Self::Cancelled)
    }
}

/// Error summary the provider attaches to a job object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJobErrors {
    /// Individual errors, in provider order
    #[serde(default)]
    pub data: Vec<BatchJobErrorEntry>,
}

/// One entry of a job's error summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJobErrorEntry {
    /// Provider error code
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Input file line the error refers to
    #[serde(default)]
    pub line: Option<u64>,
}

/// A batch job as reported by the provider.
///
/// Only status reads replace a job; nothing else mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    /// Provider batch id
    #[serde(default)]
    pub id: Option<String>,
    /// Raw status string
    #[serde(default)]
    pub status: Option<String>,
    /// Output file, set once the job completes
    #[serde(default)]
    pub output_file_id: Option<String>,
    /// Error file holding failed request lines
    #[serde(default)]
    pub error_file_id: Option<String>,
    /// Inline error summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BatchJobErrors>,
}

impl BatchJob {
    /// Parsed lifecycle state.
    pub fn state(&self) -> BatchStatus {
        BatchStatus::from_wire(self.status.as_deref())
    }

    /// Raw status string, `"unknown"` when absent.
    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }

    /// First message in the job's inline error summary.
    pub fn first_error_message(&self) -> Option<&str> {
        self.errors
            .as_ref()?
            .data
            .iter()
            .find_map(|e| e.message.as_deref())
    }
}

impl fmt::Display for BatchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.id.as_deref().unwrap_or("<no id>"),
            self.status_label()
        )
    }
}

/// Body of `POST /batches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    /// Id of the uploaded JSONL file
    pub input_file_id: String,
    /// Endpoint every line targets
    pub endpoint: String,
    /// Provider completion window, e.g. `24h`
    pub completion_window: String,
    /// Free-form tags shown on the provider side
    pub metadata: HashMap<String, String>,
}

/// Response of `POST /files`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    /// Provider file id
    #[serde(default)]
    pub id: Option<String>,
}

/// File ids of a job that reached `completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    /// Provider batch id
    pub batch_id: String,
    /// File holding the successful lines
    pub output_file_id: String,
    /// File holding failed lines, if any
    pub error_file_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(BatchStatus::from_wire(Some("validating")), BatchStatus::Queued);
        assert_eq!(BatchStatus::from_wire(Some("in_progress")), BatchStatus::InProgress);
        assert_eq!(BatchStatus::from_wire(Some("finalizing")), BatchStatus::InProgress);
        assert_eq!(BatchStatus::from_wire(Some("completed")), BatchStatus::Completed);
        assert_eq!(BatchStatus::from_wire(Some("canceled")), BatchStatus::Cancelled);
        assert_eq!(BatchStatus::from_wire(Some("cancelled")), BatchStatus::Cancelled);
        assert_eq!(BatchStatus::from_wire(Some("paused")), BatchStatus::Unknown);
        assert_eq!(BatchStatus::from_wire(None), BatchStatus::Unknown);
    }

    #[test]
    fn test_terminal_states() {
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Expired.is_terminal());
        assert!(!BatchStatus::InProgress.is_terminal());
        assert!(!BatchStatus::Unknown.is_terminal());
        assert!(!BatchStatus::Completed.is_failure());
        assert!(BatchStatus::Cancelled.is_failure());
    }

    #[test]
    fn test_job_deserializes_with_nulls() {
        let job: BatchJob = serde_json::from_str(
            r#"{"id":"batch_1","object":"batch","status":"failed","output_file_id":null,
                "error_file_id":null,"errors":{"object":"list","data":[{"code":"invalid","message":"bad line","line":3}]}}"#,
        )
        .unwrap();

        assert_eq!(job.id.as_deref(), Some("batch_1"));
        assert_eq!(job.state(), BatchStatus::Failed);
        assert_eq!(job.output_file_id, None);
        assert_eq!(job.first_error_message(), Some("bad line"));
        assert_eq!(job.to_string(), "batch_1 (failed)");
    }
}

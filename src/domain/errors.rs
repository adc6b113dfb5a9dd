//! Domain errors for the batch embedding engine.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Message fragments that mark a transport failure as a transient connectivity problem.
const TRANSIENT_TRANSPORT_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "connection reset",
    "connection refused",
    "econnreset",
    "econnrefused",
    "ehostunreach",
    "host unreachable",
    "enotfound",
    "eai_again",
    "dns error",
    "failed to lookup address",
    "network",
    "fetch failed",
    "upstream connect",
];

/// Coarse classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// The request or connection timed out.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// Anything else reported by the HTTP stack.
    Other,
}

/// A single item that the provider reported as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    /// Caller-assigned item id (the batch `custom_id`).
    pub id: String,
    /// Provider message, or a local description of what was wrong.
    pub message: String,
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

fn format_item_errors(errors: &[ItemError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// Errors raised while submitting, waiting for or reconciling batch jobs.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The provider answered with a non-success HTTP status.
    #[error("batch {operation} failed: {status} {body}")]
    Http {
        /// Call that failed (`file upload`, `create`, `status`, `file content`)
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// The request never produced an HTTP response.
    #[error("batch {operation} failed: {message}")]
    Transport {
        /// Call that failed
        operation: String,
        /// Failure class used for retry decisions
        kind: TransportKind,
        /// Error message including its source chain
        message: String,
    },

    /// The provider response could not be decoded.
    #[error("batch {operation} returned a malformed payload: {message}")]
    Decode {
        /// Call whose payload was malformed
        operation: String,
        /// Parser message
        message: String,
    },

    /// The upload response carried no file id.
    #[error("batch file upload failed: missing file id")]
    MissingFileId,

    /// The create response carried no batch id.
    #[error("batch create failed: missing batch id")]
    MissingBatchId,

    /// A completed job reported no output file.
    #[error("batch {batch_id} completed without output file")]
    MissingOutputFile {
        /// Provider batch id
        batch_id: String,
    },

    /// The job reached `failed`, `expired` or `cancelled`.
    #[error("batch {batch_id} {status}{}", format_detail(.detail))]
    JobFailed {
        /// Provider batch id
        batch_id: String,
        /// Terminal status as reported
        status: String,
        /// First error message the provider gave, if any
        detail: Option<String>,
    },

    /// The job is not finished and waiting was disabled.
    #[error("batch {batch_id} still {status}; wait disabled (enable batch.wait to await completion)")]
    WaitDisabled {
        /// Provider batch id
        batch_id: String,
        /// Status at the time of the check
        status: String,
    },

    /// The job stayed non-terminal past the poll timeout.
    #[error("batch {batch_id} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Provider batch id
        batch_id: String,
        /// Budget that ran out
        timeout: Duration,
    },

    /// One or more items in a completed job carried an error.
    #[error("batch {batch_id} failed: {}", format_item_errors(.errors))]
    ItemErrors {
        /// Provider batch id
        batch_id: String,
        /// Every failed item, in output order
        errors: Vec<ItemError>,
    },

    /// The output stream did not account for every submitted item.
    #[error("batch {batch_id} missing {count} embedding responses")]
    MissingResponses {
        /// Provider batch id
        batch_id: String,
        /// Number of ids without a line
        count: usize,
        /// Those ids, in group order
        ids: Vec<String>,
    },

    /// The input reused an item id.
    #[error("duplicate item id: {0}")]
    DuplicateItemId(String),

    /// Run options were unusable (e.g. an empty model).
    #[error("invalid batch options: {0}")]
    InvalidOptions(String),

    /// The worker pool finished without an error yet left result slots empty.
    #[error("worker pool finished with {missing} of {total} results unfilled")]
    IncompleteResults {
        /// Slots left empty
        missing: usize,
        /// Slots in the pool
        total: usize,
    },
}

impl BatchError {
    /// Returns true if the failed call may be re-issued.
    ///
    /// HTTP 429 and 5xx are transient, as are transport failures that look like
    /// timeouts or connectivity problems. Every other failure is fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { kind, message, .. } => match kind {
                TransportKind::Timeout | TransportKind::Connect => true,
                TransportKind::Other => is_transient_message(message),
            },
            _ => false,
        }
    }

    /// Item ids named by an item-level failure, in report order.
    pub fn failed_ids(&self) -> Vec<&str> {
        match self {
            Self::ItemErrors { errors, .. } => errors.iter().map(|e| e.id.as_str()).collect(),
            Self::MissingResponses { ids, .. } => ids.iter().map(String::as_str).collect(),
            Self::DuplicateItemId(id) => vec![id.as_str()],
            _ => Vec::new(),
        }
    }

    /// Provider batch id the error refers to, when known.
    pub fn batch_id(&self) -> Option<&str> {
        match self {
            Self::MissingOutputFile { batch_id }
            | Self::JobFailed { batch_id, .. }
            | Self::WaitDisabled { batch_id, .. }
            | Self::Timeout { batch_id, .. }
            | Self::ItemErrors { batch_id, .. }
            | Self::MissingResponses { batch_id, .. } => Some(batch_id),
            _ => None,
        }
    }
}

fn is_transient_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TRANSIENT_TRANSPORT_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

/// Result alias used across the engine.
pub type BatchResult<T> = Result<T, BatchError>;

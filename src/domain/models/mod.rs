//! Domain models.

pub mod config;
pub mod item;
pub mod job;
pub mod output;

pub use config::{
    BatchConfig, Config, LogFormat, LoggingConfig, ProviderConfig, RetryConfig, RotationPolicy,
};
pub use item::{BatchGroup, BatchRequest, BatchRequestBody, EmbeddingItem, EMBEDDINGS_ENDPOINT};
pub use job::{
    BatchJob, BatchJobErrorEntry, BatchJobErrors, BatchStatus, CompletedJob, CreateBatchRequest,
    FileObject, COMPLETION_WINDOW,
};
pub use output::{ErrorBody, OutputLine, OutputOutcome, OutputRecord, OutputResponse};

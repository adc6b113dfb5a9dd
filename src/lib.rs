//! Embatch - embeddings through asynchronous batch jobs
//!
//! Embatch turns a large list of `{id, text}` items into embedding vectors
//! using an OpenAI-compatible batch API. Items are split into size-bounded
//! jobs, each job is uploaded, created, polled and reconciled, and several
//! jobs run at once under a concurrency limit. Every provider call is retried
//! on transient failures with jittered exponential backoff.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the provider port
//! - **Service Layer** (`services`): Splitting, retry, submission, polling,
//!   reconciliation and the worker pool
//! - **Adapters** (`adapters`): HTTP client for the provider and an in-memory double
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use embatch::{
//!     BatchRunOptions, Config, Diagnostics, EmbeddingBatchRunner, EmbeddingItem,
//!     OpenAiBatchClient, RetryPolicy,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let runner = EmbeddingBatchRunner::new(
//!     Arc::new(OpenAiBatchClient::with_config(&config.provider)?),
//!     RetryPolicy::from_config(&config.retry),
//!     Diagnostics::none(),
//!     BatchRunOptions::from_config(&config),
//! );
//! let vectors = runner.run(&[EmbeddingItem::new("a", "hello")]).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::openai::OpenAiBatchClient;
pub use domain::models::{BatchJob, BatchStatus, Config, EmbeddingItem};
pub use domain::ports::{BatchApi, DiagnosticSink, Diagnostics};
pub use domain::{BatchError, BatchResult, ItemError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{BatchRunOptions, EmbeddingBatchRunner, RetryPolicy};

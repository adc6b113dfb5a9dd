//! Port trait definitions (Hexagonal Architecture)
//!
//! - `BatchApi`: provider transport for uploads, job creation, polling and file downloads
//! - `DiagnosticSink`: caller-supplied observer for engine progress
//!
//! These traits keep the engine independent of any particular HTTP client.

pub mod batch_api;
pub mod diagnostics;

pub use batch_api::BatchApi;
pub use diagnostics::{DiagnosticSink, Diagnostics};

//! Domain layer for the batch embedding engine
//!
//! Core models, the error taxonomy and the port traits.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{BatchError, BatchResult, ItemError, TransportKind};

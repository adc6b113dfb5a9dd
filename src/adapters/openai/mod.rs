//! OpenAI-compatible batch API adapter.
//!
//! Talks to `/files`, `/batches`, `/batches/{id}` and `/files/{id}/content`
//! on any provider exposing the OpenAI batch surface (OpenAI, Azure OpenAI
//! with a compatible base URL, local gateways).

mod client;

pub use client::OpenAiBatchClient;

//! Adapters implementing the batch provider port.

pub mod mock;
pub mod openai;

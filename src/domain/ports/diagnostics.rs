//! Diagnostic callback port.
//!
//! Callers can observe retries, job creation and polling progress by
//! supplying a sink that receives a message plus structured context.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Receiver for engine diagnostics.
pub trait DiagnosticSink: Send + Sync {
    /// Receive one diagnostic record.
    fn record(&self, message: &str, context: &Value);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str, &Value) + Send + Sync,
{
    fn record(&self, message: &str, context: &Value) {
        self(message, context);
    }
}

/// Optional sink shared by every stage of a run.
///
/// Every record is also emitted as a `tracing` debug event, so diagnostics are
/// visible in logs even when no sink is attached.
#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl Diagnostics {
    /// Diagnostics that forward to `sink`.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Diagnostics with no sink; records only reach `tracing`.
    pub const fn none() -> Self {
        Self { sink: None }
    }

    /// Record `message` with structured `context`.
    pub fn record(&self, message: &str, context: Value) {
        tracing::debug!(context = %context, "{message}");
        if let Some(sink) = &self.sink {
            sink.record(message, &context);
        }
    }

    /// True when a sink is attached.
    pub const fn is_attached(&self) -> bool {
        self.sink.is_some()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("attached", &self.is_attached())
            .finish()
    }
}

//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON console output on stderr
//! - Optional JSON log files with rotation via tracing-appender

mod logger;

pub use logger::LoggerImpl;

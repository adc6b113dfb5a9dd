//! Configuration model: provider, batch, retry and logging sections.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure for embatch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Remote provider connection settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Batch job submission settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Retry policy for every provider call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Provider (OpenAI-compatible API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            headers: HashMap::new(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Batch job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Wait for jobs to complete instead of failing once submitted
    #[serde(default = "default_wait")]
    pub wait: bool,

    /// Delay between status polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-job timeout in minutes
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,

    /// Maximum number of jobs in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Provider cap on requests per job
    #[serde(default = "default_max_requests_per_job")]
    pub max_requests_per_job: usize,

    /// Endpoint each request line targets
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Logical source label attached to job metadata
    #[serde(default = "default_source")]
    pub source: String,

    /// Agent / tenant identifier attached to job metadata
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
}

const fn default_wait() -> bool {
    true
}

const fn default_poll_interval_ms() -> u64 {
    2_000
}

const fn default_timeout_minutes() -> u64 {
    60
}

const fn default_concurrency() -> usize {
    2
}

const fn default_max_requests_per_job() -> usize {
    50_000
}

fn default_endpoint() -> String {
    crate::domain::models::item::EMBEDDINGS_ENDPOINT.to_string()
}

fn default_source() -> String {
    "memory-embeddings".to_string()
}

fn default_agent_id() -> String {
    "main".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            wait: default_wait(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_minutes: default_timeout_minutes(),
            concurrency: default_concurrency(),
            max_requests_per_job: default_max_requests_per_job(),
            endpoint: default_endpoint(),
            source: default_source(),
            agent_id: default_agent_id(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound on any single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter fraction applied to each delay (0.0-1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_min_delay_ms() -> u64 {
    500
}

const fn default_max_delay_ms() -> u64 {
    5_000
}

const fn default_jitter() -> f64 {
    0.1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable multi-line output
    #[default]
    Pretty,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// New file every day
    #[default]
    Daily,
    /// New file every hour
    Hourly,
    /// Single file, never rotated
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log file rotation
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

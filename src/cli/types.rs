//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::models::Config;

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "embatch")]
#[command(about = "Embatch - embeddings through asynchronous batch jobs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this YAML file instead of .embatch/
    #[arg(short, long, global = true, env = "EMBATCH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Embatch subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed every item of a JSONL file through batch jobs
    Embed(EmbedArgs),

    /// Show the provider-side state of one batch job
    Status {
        /// Provider batch id (e.g. batch_abc123)
        batch_id: String,
    },

    /// Print the effective configuration
    Config,
}

/// Arguments of `embatch embed`.
#[derive(Args, Debug, Clone, Default)]
pub struct EmbedArgs {
    /// JSONL file with one {"id", "text"} object per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the {id: vector} map here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Embedding model (overrides provider.model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Fail instead of waiting when a job is not finished yet
    #[arg(long)]
    pub no_wait: bool,

    /// Maximum number of jobs in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Delay between status polls in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Per-job timeout in minutes
    #[arg(long)]
    pub timeout_minutes: Option<u64>,
}

impl EmbedArgs {
    /// Apply command-line overrides on top of loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.provider.model.clone_from(model);
        }
        if self.no_wait {
            config.batch.wait = false;
        }
        if let Some(concurrency) = self.concurrency {
            config.batch.concurrency = concurrency;
        }
        if let Some(interval) = self.poll_interval_ms {
            config.batch.poll_interval_ms = interval;
        }
        if let Some(minutes) = self.timeout_minutes {
            config.batch.timeout_minutes = minutes;
        }
    }
}

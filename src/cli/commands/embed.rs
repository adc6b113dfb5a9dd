//! `embatch embed`: turn a JSONL item file into an `{id: vector}` map.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::openai::OpenAiBatchClient;
use crate::cli::output::progress::{run_spinner, spinner_diagnostics, RunSpinner};
use crate::cli::output::table::format_key_values;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::EmbedArgs;
use crate::domain::models::{Config, EmbeddingItem};
use crate::domain::ports::Diagnostics;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{BatchRunOptions, EmbeddingBatchRunner, RetryPolicy, MAX_REQUESTS_PER_JOB};

/// Summary of one `embed` run.
#[derive(Debug, Serialize)]
pub struct EmbedSummary {
    /// Items read from the input file
    pub items: usize,
    /// Batch jobs submitted
    pub groups: usize,
    /// Vectors returned
    pub vectors: usize,
    /// Length of each vector
    pub dimensions: usize,
    /// Embedding model used
    pub model: String,
    /// Output path, `None` for stdout
    pub output: Option<String>,
    /// Wall time of the run
    pub elapsed_ms: u128,
}

impl CommandOutput for EmbedSummary {
    fn to_human(&self) -> String {
        let rows = [
            ("Model", self.model.clone()),
            ("Items", self.items.to_string()),
            ("Batch jobs", self.groups.to_string()),
            ("Vectors", self.vectors.to_string()),
            ("Dimensions", self.dimensions.to_string()),
            ("Output", self.output.clone().unwrap_or_else(|| "stdout".to_string())),
            ("Elapsed", format!("{:.1}s", self.elapsed_ms as f64 / 1000.0)),
        ];
        format_key_values(&rows)
    }
}

/// Parse a JSONL file of `{"id", "text"}` objects. Blank lines are skipped.
pub fn parse_items(content: &str) -> Result<Vec<EmbeddingItem>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid item on line {}", index + 1))
        })
        .collect()
}

async fn read_items(path: &Path) -> Result<Vec<EmbeddingItem>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_items(&content)
}

/// Handle the embed command
pub async fn execute(args: EmbedArgs, mut config: Config, json: bool) -> Result<()> {
    args.apply_to(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration")?;

    let items = read_items(&args.input).await?;
    let client = OpenAiBatchClient::with_config(&config.provider)?;

    let spinner = (!json).then(run_spinner);
    let diagnostics = spinner
        .as_ref()
        .map_or_else(Diagnostics::none, spinner_diagnostics);

    let options = BatchRunOptions::from_config(&config);
    let groups = items
        .len()
        .div_ceil(options.max_requests_per_job.clamp(1, MAX_REQUESTS_PER_JOB));
    let runner = EmbeddingBatchRunner::new(
        Arc::new(client),
        RetryPolicy::from_config(&config.retry),
        diagnostics,
        options,
    );

    let started = Instant::now();
    let vectors = match runner.run(&items).await {
        Ok(vectors) => vectors,
        Err(err) => {
            if let Some(spinner) = &spinner {
                spinner.fail(&err);
            }
            return Err(err).context("Embedding batch run failed");
        }
    };
    if let Some(spinner) = &spinner {
        spinner.succeed(format_args!("{} vectors", vectors.len()));
    }

    let dimensions = vectors.values().next().map_or(0, Vec::len);
    let sorted: BTreeMap<String, Vec<f32>> = vectors.into_iter().collect();
    let rendered = serde_json::to_string(&sorted)?;

    let summary = EmbedSummary {
        items: items.len(),
        groups,
        vectors: sorted.len(),
        dimensions,
        model: config.provider.model.clone(),
        output: args.output.as_ref().map(|p| p.display().to_string()),
        elapsed_ms: started.elapsed().as_millis(),
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output(&summary, json);
        }
        None => {
            println!("{rendered}");
            if !json {
                eprintln!("{}", summary.to_human());
            }
        }
    }

    Ok(())
}

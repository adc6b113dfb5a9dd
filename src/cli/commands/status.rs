//! `embatch status`: show one provider batch job.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::openai::OpenAiBatchClient;
use crate::cli::output::table::format_job;
use crate::domain::models::Config;
use crate::domain::ports::Diagnostics;
use crate::services::{ResilientBatchApi, RetryPolicy};

/// Handle the status command
pub async fn execute(batch_id: String, config: Config, json: bool) -> Result<()> {
    let client = OpenAiBatchClient::with_config(&config.provider)?;
    let api = ResilientBatchApi::new(
        Arc::new(client),
        RetryPolicy::from_config(&config.retry),
        Diagnostics::none(),
    );

    let job = api
        .retrieve_batch(&batch_id)
        .await
        .with_context(|| format!("Failed to retrieve batch {batch_id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        println!("{}", format_job(&job));
    }

    Ok(())
}

//! Matching output-file lines back to the items a group submitted.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::domain::errors::{BatchError, BatchResult, ItemError};
use crate::domain::models::{BatchGroup, CompletedJob, OutputLine, OutputOutcome};
use crate::services::resilient_api::ResilientBatchApi;

/// Parse a JSONL output or error file. Blank lines are skipped.
pub fn parse_output(text: &str) -> BatchResult<Vec<OutputLine>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| BatchError::Decode {
                operation: "file content".to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Reconcile parsed lines against the ids `group` submitted.
///
/// All-or-nothing: any item error fails the whole group, and so does any
/// submitted id with no line at all. Item errors are reported first.
/// A successful line for an id the group never sent is ignored; an error
/// line for such an id still fails the group.
pub fn reconcile(
    batch_id: &str,
    group: &BatchGroup,
    lines: Vec<OutputLine>,
) -> BatchResult<HashMap<String, Vec<f32>>> {
    let expected: HashSet<&str> = group.custom_ids().collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(expected.len());
    let mut embeddings = HashMap::with_capacity(expected.len());
    let mut errors = Vec::new();

    for record in lines.into_iter().filter_map(OutputLine::into_record) {
        if !expected.contains(record.custom_id.as_str()) {
            match record.outcome {
                OutputOutcome::Error(message) => errors.push(ItemError {
                    id: record.custom_id,
                    message,
                }),
                OutputOutcome::Embedding(_) => {
                    debug!(batch_id, custom_id = %record.custom_id, "ignoring output line for unknown id");
                }
            }
            continue;
        }
        if !seen.insert(record.custom_id.clone()) {
            errors.push(ItemError {
                id: record.custom_id,
                message: "duplicate response".to_string(),
            });
            continue;
        }

        match record.outcome {
            OutputOutcome::Embedding(vector) => {
                embeddings.insert(record.custom_id, vector);
            }
            OutputOutcome::Error(message) => errors.push(ItemError {
                id: record.custom_id,
                message,
            }),
        }
    }

    if !errors.is_empty() {
        return Err(BatchError::ItemErrors {
            batch_id: batch_id.to_string(),
            errors,
        });
    }

    let missing: Vec<String> = group
        .custom_ids()
        .filter(|id| !seen.contains(*id))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(BatchError::MissingResponses {
            batch_id: batch_id.to_string(),
            count: missing.len(),
            ids: missing,
        });
    }

    Ok(embeddings)
}

/// First error message in an error file, for failed-job reports.
///
/// Never fails: an unreadable file becomes the detail itself.
pub async fn read_error_detail(api: &ResilientBatchApi, file_id: &str) -> Option<String> {
    let lines = api
        .file_content(file_id)
        .await
        .and_then(|text| parse_output(&text));

    match lines {
        Ok(lines) => lines
            .iter()
            .find_map(|line| line.top_level_error().or_else(|| line.body_error()))
            .map(str::to_string),
        Err(e) => Some(format!("error file unavailable: {e}")),
    }
}

/// Download a completed job's output and reconcile it against `group`.
///
/// Lines from the job's error file, when present, are reconciled too so that
/// items the provider diverted there are reported with their real message.
/// Failing to read the error file is logged and otherwise ignored.
#[instrument(skip_all, fields(batch_id = %completed.batch_id, group = group.index))]
pub async fn fetch_group_results(
    api: &ResilientBatchApi,
    completed: &CompletedJob,
    group: &BatchGroup,
) -> BatchResult<HashMap<String, Vec<f32>>> {
    let content = api.file_content(&completed.output_file_id).await?;
    let mut lines = parse_output(&content)?;

    if let Some(error_file_id) = &completed.error_file_id {
        match api
            .file_content(error_file_id)
            .await
            .and_then(|text| parse_output(&text))
        {
            Ok(extra) => lines.extend(extra),
            Err(e) => warn!(%error_file_id, error = %e, "could not read batch error file"),
        }
    }

    reconcile(&completed.batch_id, group, lines)
}

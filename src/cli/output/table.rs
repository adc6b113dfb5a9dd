//! Table output formatting for CLI commands
//!
//! Key/value tables for run summaries and job status using comfy-table.

use std::env;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{BatchJob, BatchStatus};

/// Check if terminal supports colors
fn supports_color() -> bool {
    env::var_os("NO_COLOR").is_none()
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
    table
}

fn status_color(status: BatchStatus) -> Color {
    match status {
        BatchStatus::Completed => Color::Green,
        BatchStatus::Failed | BatchStatus::Expired | BatchStatus::Cancelled => Color::Red,
        BatchStatus::Queued | BatchStatus::InProgress => Color::Yellow,
        BatchStatus::Unknown => Color::Grey,
    }
}

/// Format `(field, value)` pairs as a two-column table
pub fn format_key_values(rows: &[(&str, String)]) -> String {
    let mut table = base_table();
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    table.to_string()
}

/// Format one batch job as a table
pub fn format_job(job: &BatchJob) -> String {
    let mut table = base_table();
    let dash = || "-".to_string();

    let status = Cell::new(job.status_label());
    let status = if supports_color() {
        status.fg(status_color(job.state()))
    } else {
        status
    };

    table.add_row(vec![
        Cell::new("ID"),
        Cell::new(job.id.clone().unwrap_or_else(dash)),
    ]);
    table.add_row(vec![Cell::new("Status"), status]);
    table.add_row(vec![
        Cell::new("Output file"),
        Cell::new(job.output_file_id.clone().unwrap_or_else(dash)),
    ]);
    table.add_row(vec![
        Cell::new("Error file"),
        Cell::new(job.error_file_id.clone().unwrap_or_else(dash)),
    ]);
    if let Some(message) = job.first_error_message() {
        table.add_row(vec![Cell::new("Error"), Cell::new(message)]);
    }

    table.to_string()
}

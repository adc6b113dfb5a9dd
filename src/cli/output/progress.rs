//! Run spinner driven by engine diagnostics

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::domain::ports::Diagnostics;

const RUN_TEMPLATE: &str = "{spinner:.cyan} {elapsed:>4} {wide_msg}";
const TICK_STRINGS: &[&str] = &["◐", "◓", "◑", "◒", "●"];
const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Spinner shown while an embedding run is in flight.
///
/// # Example
/// ```
/// use embatch::cli::output::progress::{run_spinner, RunSpinner};
///
/// let spinner = run_spinner();
/// spinner.set_message("batch batch_1 in_progress; waiting 2000ms");
/// spinner.succeed("3 vectors");
/// ```
pub fn run_spinner() -> ProgressBar {
    let style = ProgressStyle::with_template(RUN_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICK_STRINGS);
    let spinner = ProgressBar::new_spinner().with_style(style);
    spinner.set_message("submitting batch jobs");
    spinner.enable_steady_tick(TICK_INTERVAL);
    spinner
}

/// Diagnostics that show each record as the spinner message.
pub fn spinner_diagnostics(spinner: &ProgressBar) -> Diagnostics {
    let spinner = spinner.clone();
    Diagnostics::new(Arc::new(move |message: &str, _context: &Value| {
        spinner.set_message(message.to_string());
    }))
}

/// Terminal states of a run spinner.
pub trait RunSpinner {
    /// Finish with a success summary.
    fn succeed(&self, summary: impl Display);
    /// Stop and leave the error on screen.
    fn fail(&self, error: impl Display);
}

impl RunSpinner for ProgressBar {
    fn succeed(&self, summary: impl Display) {
        self.finish_with_message(format!("done: {summary}"));
    }

    fn fail(&self, error: impl Display) {
        self.abandon_with_message(format!("failed: {error}"));
    }
}

//! Output formatting utilities for the CLI.

pub mod progress;
pub mod table;

use serde::Serialize;

/// A command result that renders for people or for scripts.
pub trait CommandOutput: Serialize {
    /// Render for a terminal.
    fn to_human(&self) -> String;

    /// Render for `--json` mode.
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print `result` to stdout as pretty JSON or as its human rendering.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    let rendered = if json_mode {
        serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
    } else {
        result.to_human()
    };
    println!("{rendered}");
}

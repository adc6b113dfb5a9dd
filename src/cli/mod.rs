//! Command-line interface.

pub mod commands;
pub mod output;
mod types;

use std::path::Path;

use anyhow::Result;

pub use types::{Cli, Commands, EmbedArgs};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Load configuration from `path`, or from the `.embatch/` hierarchy when unset.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Report a command failure and exit with status 1.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({ "error": err.to_string(), "causes": causes });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}

//! `embatch config`: print the effective configuration.

use anyhow::Result;

use crate::domain::models::Config;

const REDACTED: &str = "********";

/// Copy of `config` that is safe to print.
pub fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.provider.api_key.is_some() {
        config.provider.api_key = Some(REDACTED.to_string());
    }
    for (name, value) in &mut config.provider.headers {
        let name = name.to_ascii_lowercase();
        if name.contains("authorization") || name.contains("key") || name.contains("token") {
            *value = REDACTED.to_string();
        }
    }
    config
}

/// Handle the config command
pub fn execute(config: &Config, json: bool) -> Result<()> {
    let config = redacted(config);
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
    }
    Ok(())
}

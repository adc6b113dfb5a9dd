//! Embatch CLI entry point.

use clap::Parser;

use embatch::cli::{handle_error, load_config, Cli, Commands};
use embatch::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Embed(args) => embatch::cli::commands::embed::execute(args, config, cli.json).await,
        Commands::Status { batch_id } => {
            embatch::cli::commands::status::execute(batch_id, config, cli.json).await
        }
        Commands::Config => embatch::cli::commands::config::execute(&config, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}

//! Command-line parsing of the embatch binary.

use std::path::PathBuf;

use clap::Parser;
use embatch::cli::{Cli, Commands};

#[test]
fn test_parse_embed_minimal() {
    let cli = Cli::try_parse_from(["embatch", "embed", "--input", "items.jsonl"]).unwrap();

    assert!(!cli.json);
    match cli.command {
        Commands::Embed(args) => {
            assert_eq!(args.input, PathBuf::from("items.jsonl"));
            assert!(args.output.is_none());
            assert!(args.model.is_none());
            assert!(!args.no_wait);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_embed_overrides() {
    let cli = Cli::try_parse_from([
        "embatch",
        "embed",
        "-i",
        "items.jsonl",
        "-o",
        "vectors.json",
        "--model",
        "text-embedding-3-large",
        "--no-wait",
        "--concurrency",
        "8",
        "--poll-interval-ms",
        "500",
        "--timeout-minutes",
        "30",
    ])
    .unwrap();

    match cli.command {
        Commands::Embed(args) => {
            assert_eq!(args.output, Some(PathBuf::from("vectors.json")));
            assert_eq!(args.model.as_deref(), Some("text-embedding-3-large"));
            assert!(args.no_wait);
            assert_eq!(args.concurrency, Some(8));
            assert_eq!(args.poll_interval_ms, Some(500));
            assert_eq!(args.timeout_minutes, Some(30));
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_status() {
    let cli = Cli::try_parse_from(["embatch", "status", "batch_abc123", "--json"]).unwrap();

    assert!(cli.json);
    match cli.command {
        Commands::Status { batch_id } => assert_eq!(batch_id, "batch_abc123"),
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_global_config_flag() {
    let cli = Cli::try_parse_from(["embatch", "config", "--config", "custom.yaml"]).unwrap();

    assert!(matches!(cli.command, Commands::Config));
    assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
}

#[test]
fn test_embed_requires_input() {
    assert!(Cli::try_parse_from(["embatch", "embed"]).is_err());
}

#[test]
fn test_concurrency_must_be_numeric() {
    assert!(Cli::try_parse_from(["embatch", "embed", "-i", "x.jsonl", "--concurrency", "many"]).is_err());
}

//! Unit tests for CLI argument parsing

use crate::cli::{Cli, Commands};
use clap::Parser;

#[test]
fn test_resolve_command_parses_positionals() {
    let cli = Cli::try_parse_from(["segroute", "resolve", "-m", "routes.yaml", "get", "/users/1"])
        .unwrap();
    match cli.command {
        Commands::Resolve {
            source,
            method,
            path,
        } => {
            assert_eq!(source.manifest.to_string_lossy(), "routes.yaml");
            assert!(source.config.is_none());
            assert_eq!(method, "get");
            assert_eq!(path, "/users/1");
        }
        other => panic!("Expected Resolve command, got {other:?}"),
    }
}

#[test]
fn test_request_command_collects_headers() {
    let cli = Cli::try_parse_from([
        "segroute",
        "request",
        "--manifest",
        "routes.yaml",
        "--config",
        "app.yaml",
        "POST",
        "/users",
        "-H",
        "x-a: 1",
        "-H",
        "x-b: 2",
        "--body",
        "{}",
    ])
    .unwrap();
    match cli.command {
        Commands::Request {
            source,
            headers,
            body,
            ..
        } => {
            assert_eq!(source.config.unwrap().to_string_lossy(), "app.yaml");
            assert_eq!(headers, vec!["x-a: 1", "x-b: 2"]);
            assert_eq!(body.as_deref(), Some("{}"));
        }
        other => panic!("Expected Request command, got {other:?}"),
    }
}

#[test]
fn test_manifest_is_required() {
    assert!(Cli::try_parse_from(["segroute", "tree"]).is_err());
}

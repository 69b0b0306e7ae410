//! CLI tests module
//!
//! Argument parsing, input loading, event rendering and atomic writes.

use super::args::{Cli, Commands, EventFormat, build_cli};
use super::inputs::{load_attachment, load_document, mime_for, read_request};
use super::output::{render_event, write_atomic, written_notice};
use crate::{DealmemoError, ExitCode, planned_events};
use clap::Parser;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_cli_definition_is_consistent() {
    build_cli().debug_assert();
}

#[test]
fn test_run_parses_all_flags() {
    let cli = Cli::try_parse_from([
        "dealmemo",
        "--provider",
        "anthropic",
        "--phase-timeout",
        "30",
        "run",
        "Analyze Acme Corp",
        "--attach",
        "deck.pdf",
        "--attach",
        "model.xlsx",
        "--document",
        "memo.json",
        "-o",
        "out.json",
        "--events",
        "text",
        "--no-confirm",
    ])
    .unwrap();

    assert_eq!(cli.provider.as_deref(), Some("anthropic"));
    assert_eq!(cli.phase_timeout, Some(30));
    match cli.command {
        Commands::Run {
            request,
            attachments,
            document,
            output,
            events,
            no_confirm,
        } => {
            assert_eq!(request.as_deref(), Some("Analyze Acme Corp"));
            assert_eq!(
                attachments,
                vec![PathBuf::from("deck.pdf"), PathBuf::from("model.xlsx")]
            );
            assert_eq!(document, Some(PathBuf::from("memo.json")));
            assert_eq!(output, Some(PathBuf::from("out.json")));
            assert_eq!(events, EventFormat::Text);
            assert!(no_confirm);
        }
        other => panic!("expected run, got {other:?}"),
    }
}

#[test]
fn test_run_defaults() {
    let cli = Cli::try_parse_from(["dealmemo", "run"]).unwrap();
    assert!(!cli.verbose);
    assert!(cli.config.is_none());
    match cli.command {
        Commands::Run {
            request,
            attachments,
            events,
            no_confirm,
            ..
        } => {
            assert!(request.is_none());
            assert!(attachments.is_empty());
            assert_eq!(events, EventFormat::Ndjson);
            assert!(!no_confirm);
        }
        other => panic!("expected run, got {other:?}"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["dealmemo", "phases", "--json", "-v", "--log-json"]).unwrap();
    assert!(cli.verbose);
    assert!(cli.log_json);
    assert!(matches!(cli.command, Commands::Phases { json: true }));
}

#[test]
fn test_unknown_event_format_rejected() {
    let err = Cli::try_parse_from(["dealmemo", "run", "x", "--events", "xml"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
}

#[test]
fn test_mime_inference() {
    assert_eq!(mime_for(Path::new("deck.PDF")), "application/pdf");
    assert_eq!(mime_for(Path::new("photo.jpeg")), "image/jpeg");
    assert_eq!(mime_for(Path::new("photo.jpg")), "image/jpeg");
    assert_eq!(mime_for(Path::new("financials.csv")), "text/csv");
    assert_eq!(
        mime_for(Path::new("model.xlsx")),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(mime_for(Path::new("README")), "application/octet-stream");
}

#[test]
fn test_blank_request_is_a_config_error() {
    let err = read_request(Some("   \n".to_string())).unwrap_err();
    let domain = err.downcast::<DealmemoError>().unwrap();
    assert_eq!(domain.to_exit_code(), ExitCode::CLI_ARGS);
}

#[test]
fn test_request_is_trimmed() {
    let text = read_request(Some("  Analyze Acme Corp\n".to_string())).unwrap();
    assert_eq!(text, "Analyze Acme Corp");
}

#[test]
fn test_load_attachment_encodes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"hello").unwrap();

    let attachment = load_attachment(&path).unwrap();
    assert_eq!(attachment.name, "notes.txt");
    assert_eq!(attachment.mime_type, "text/plain");
    assert_eq!(attachment.data, "aGVsbG8=");
}

#[test]
fn test_missing_attachment_maps_to_cli_args() {
    let dir = TempDir::new().unwrap();
    let err = load_attachment(&dir.path().join("absent.pdf")).unwrap_err();
    let domain = err.downcast::<DealmemoError>().unwrap();
    assert_eq!(domain.to_exit_code(), ExitCode::CLI_ARGS);
    assert!(domain.display_for_user().contains("--attach"));
}

#[test]
fn test_load_document_round_trips_written_output() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memo.json");
    std::fs::write(&path, r#"{"title":"Acme Corp Credit Memo","industryAnalysis":"Stable"}"#)
        .unwrap();

    let document = load_document(&path).unwrap();
    assert_eq!(document.title, "Acme Corp Credit Memo");
    assert_eq!(document.industry_analysis, "Stable");
}

#[test]
fn test_invalid_document_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memo.json");
    std::fs::write(&path, "not json").unwrap();

    let err = load_document(&path).unwrap_err();
    let domain = err.downcast::<DealmemoError>().unwrap();
    assert_eq!(domain.to_exit_code(), ExitCode::CLI_ARGS);
}

#[test]
fn test_render_event_ndjson_is_single_line() {
    let event = &planned_events()[0];
    let line = render_event(event, EventFormat::Ndjson).unwrap();
    assert!(!line.contains('\n'));

    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["phase"], "data_collection");
    assert_eq!(value["status"], "pending");
    assert!(value.get("partialData").is_none());
}

#[test]
fn test_render_event_text() {
    let event = &planned_events()[1];
    let line = render_event(event, EventFormat::Text).unwrap();
    assert!(line.starts_with('['));
    assert!(line.contains("pending"));
    assert!(line.ends_with(&format!("{}: {}", event.agent, event.message)));
}

#[test]
fn test_write_atomic_replaces_contents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("memo.json");

    write_atomic(&path, "{\"a\":1}\n").unwrap();
    write_atomic(&path, "{\"a\":2}\n").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":2}\n");
    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn test_written_notice_includes_fingerprint() {
    let doc = crate::Document::default();
    let hash = doc.fingerprint().unwrap();
    let notice = written_notice(Path::new("memo.json"), Ok(hash.clone()));
    assert_eq!(notice, format!("✓ Memo written to memo.json (blake3 {hash})"));
}

#[test]
fn test_written_notice_survives_fingerprint_failure() {
    let notice = written_notice(
        Path::new("out/memo.json"),
        Err(anyhow::anyhow!("serialization failed")),
    );
    assert_eq!(notice, "✓ Memo written to out/memo.json");
}

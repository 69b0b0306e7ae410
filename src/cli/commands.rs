//! CLI command implementations
//!
//! Each `execute_*` function handles one subcommand. Handlers return
//! `anyhow::Result`; domain errors travel inside as [`DealmemoError`] so the
//! dispatcher can render them and pick the exit code.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use tokio_stream::StreamExt;

use super::args::EventFormat;
use super::inputs::{load_attachment, load_document, read_request};
use super::output::{render_event, write_document, written_notice};

use crate::{Config, DealmemoError, Document, OrchestratorHandle, WorkflowRequest};

// ============================================================================
// Run Command
// ============================================================================

/// Options for `dealmemo run`, as parsed from the command line.
#[derive(Debug, Clone)]
pub(crate) struct RunOptions {
    pub request: Option<String>,
    pub attachments: Vec<PathBuf>,
    pub document: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub events: EventFormat,
    pub no_confirm: bool,
}

/// Run the six phases, streaming events to stdout.
///
/// On failure the last-good document is written to `--output` (if given)
/// before the error is returned.
pub(crate) async fn execute_run_command(opts: RunOptions, config: &Config) -> Result<()> {
    let request_text = read_request(opts.request)?;
    let attachments = opts
        .attachments
        .iter()
        .map(|path| load_attachment(path))
        .collect::<Result<Vec<_>>>()?;
    let seed = match &opts.document {
        Some(path) => load_document(path)?,
        None => Document::default(),
    };

    let handle = OrchestratorHandle::from_config(config)?;
    if let Some(info) = handle.fallback_info() {
        eprintln!(
            "⚠ Provider '{}' unavailable, using '{}': {}",
            info.primary_provider, info.fallback_provider, info.reason
        );
    }

    let request = WorkflowRequest::new(request_text.clone())
        .with_attachments(attachments)
        .with_document(seed);
    let mut run = handle.run(request);
    tracing::info!(run_id = %run.run_id, provider = handle.provider(), "Run started");

    let cancel = run.cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling run");
            cancel.cancel();
        }
    });

    while let Some(event) = run.events.next().await {
        let line = render_event(&event, opts.events)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}").context("Failed to write event")?;
        stdout.flush().ok();
    }

    let outcome = run.finish().await;
    ctrl_c.abort();

    match outcome {
        Ok(document) => {
            if !opts.no_confirm {
                let confirmation = handle.confirm(&document, &request_text).await;
                eprintln!("{}", confirmation.message);
            }
            let notice = opts
                .output
                .as_deref()
                .map(|path| written_notice(path, document.fingerprint()));
            write_document(&document, opts.output.as_deref())?;
            if let Some(notice) = notice {
                eprintln!("{notice}");
            }
            Ok(())
        }
        Err(failure) => {
            if let Some(path) = opts.output.as_deref() {
                write_document(&failure.document, Some(path))
                    .context("Failed to write last-good document")?;
                eprintln!("Partial document written to {}", path.display());
            }
            Err(DealmemoError::Workflow(failure.error).into())
        }
    }
}

// ============================================================================
// Config Command
// ============================================================================

/// Print the effective configuration with the source of every value.
pub(crate) fn execute_config_command(config: &Config, json: bool) -> Result<()> {
    let effective: BTreeMap<String, (String, String)> =
        config.effective_config().into_iter().collect();

    if json {
        let entries: BTreeMap<&str, serde_json::Value> = effective
            .iter()
            .map(|(key, (value, source))| {
                (
                    key.as_str(),
                    serde_json::json!({ "value": value, "source": source }),
                )
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize config")?
        );
        return Ok(());
    }

    println!("=== Effective Configuration ===");
    for (key, (value, source)) in &effective {
        println!("  {key} = {value}  ({source})");
    }
    Ok(())
}

// ============================================================================
// Phases Command
// ============================================================================

/// Print the resolved plan: one row per phase plus the confirmation call.
pub(crate) fn execute_phases_command(config: &Config, json: bool) -> Result<()> {
    let plan = crate::phases::plan(config).map_err(DealmemoError::Config)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("Failed to serialize phase plan")?
        );
        return Ok(());
    }

    println!(
        "{:<20} {:<28} {:>8} {:>9} {:>6} {:>7}  tools",
        "phase", "model", "timeout", "reasoning", "temp", "budget"
    );
    for row in &plan {
        let model = row.model.as_deref().unwrap_or("(provider default)");
        let temperature = row
            .temperature
            .map_or_else(|| "-".to_string(), |t| format!("{t:.1}"));
        let tools = if row.tools.is_empty() {
            "-".to_string()
        } else {
            row.tools.join(",")
        };
        println!(
            "{:<20} {:<28} {:>7}s {:>9} {:>6} {:>7}  {}",
            row.label,
            model,
            row.timeout_secs,
            if row.reasoning { "yes" } else { "no" },
            temperature,
            row.token_budget,
            tools
        );
    }
    Ok(())
}

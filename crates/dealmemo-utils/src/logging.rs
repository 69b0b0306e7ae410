//! Logging and observability infrastructure for dealmemo.
//!
//! All log output goes to stderr; stdout is reserved for the event stream
//! and the assembled document.

use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::redaction::redact_error_message;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence. Without it the filter is
/// `dealmemo=debug,info` when `verbose` is set and `dealmemo=info,warn`
/// otherwise.
///
/// # Arguments
/// * `verbose` - include targets and span close timings
/// * `json` - emit one JSON object per log line instead of compact text
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("dealmemo=debug,info")
            } else {
                EnvFilter::try_new("dealmemo=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?;
    } else if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Create a span for one phase of a run.
#[must_use]
pub fn phase_span(run_id: &str, phase: &str, provider: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "phase",
        run_id = %run_id,
        phase = %phase,
        provider = %provider,
    )
}

/// Log phase start with structured fields
pub fn log_phase_start(phase: &str, model: &str) {
    info!(phase = %phase, model = %model, "Starting phase");
}

/// Log phase completion with duration and token usage
pub fn log_phase_complete(
    phase: &str,
    duration_ms: u128,
    tokens_input: Option<u64>,
    tokens_output: Option<u64>,
) {
    info!(
        phase = %phase,
        duration_ms = %duration_ms,
        tokens_input = ?tokens_input,
        tokens_output = ?tokens_output,
        "Phase completed"
    );
}

/// Log phase error with context.
///
/// Error messages are redacted to prevent secrets from appearing in logs.
pub fn log_phase_error(phase: &str, error: &str, duration_ms: u128) {
    let sanitized_error = redact_error_message(error);
    error!(
        phase = %phase,
        duration_ms = %duration_ms,
        error = %sanitized_error,
        "Phase failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_helpers_do_not_panic_without_subscriber() {
        log_phase_start("writing", "claude-sonnet-4-5");
        log_phase_complete("writing", 12, Some(100), None);
        log_phase_error("writing", "x-api-key: sk-ant-secret", 12);
    }
}

//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Initializes logging and the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands::{self, RunOptions};

use crate::error::ConfigError;
use crate::logging::init_tracing;
use crate::redaction::redact_error_message;
use crate::{CliArgs, Config, DealmemoError, ExitCode};

/// Main CLI execution function.
///
/// This function handles ALL output including errors. It returns `Result<(), ExitCode>`:
/// - On success: returns `Ok(())` after printing any output
/// - On error: prints a user-facing report to stderr, returns `Err(ExitCode)`
///
/// main.rs only calls `std::process::exit(code.as_i32())` on error - it does NOT print.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        model: cli.model.clone(),
        llm_provider: cli.provider.clone(),
        phase_timeout: cli.phase_timeout,
        verbose: cli.verbose.then_some(true),
        log_json: cli.log_json.then_some(true),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            return Err(match err.downcast::<ConfigError>() {
                Ok(config_err) => report(&DealmemoError::Config(config_err)),
                Err(other) => {
                    eprintln!(
                        "✗ Failed to load configuration: {}",
                        redact_error_message(&format!("{other:#}"))
                    );
                    ExitCode::CLI_ARGS
                }
            });
        }
    };

    if let Err(e) = init_tracing(config.verbose(), config.log_json()) {
        eprintln!("⚠ Logging unavailable: {e}");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Run {
                request,
                attachments,
                document,
                output,
                events,
                no_confirm,
            } => {
                let opts = RunOptions {
                    request,
                    attachments,
                    document,
                    output,
                    events,
                    no_confirm,
                };
                commands::execute_run_command(opts, &config).await
            }
            Commands::Config { json } => commands::execute_config_command(&config, json),
            Commands::Phases { json } => commands::execute_phases_command(&config, json),
        }
    });

    result.map_err(|err| match err.downcast::<DealmemoError>() {
        Ok(domain) => report(&domain),
        Err(other) => match other.downcast::<ConfigError>() {
            Ok(config_err) => report(&DealmemoError::Config(config_err)),
            Err(other) => {
                eprintln!("✗ {}", redact_error_message(&format!("{other:#}")));
                ExitCode::INTERNAL
            }
        },
    })
}

fn report(err: &DealmemoError) -> ExitCode {
    eprint!("{}", err.display_for_user());
    err.to_exit_code()
}

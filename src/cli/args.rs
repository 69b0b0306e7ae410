//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and all subcommand enums.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dealmemo - six-phase credit memorandum generation
#[derive(Parser, Debug)]
#[command(name = "dealmemo")]
#[command(about = "Generate structured credit memoranda with an LLM backend, one phase at a time")]
#[command(long_about = r#"
dealmemo turns a free-text request and optional source documents into a
structured credit memorandum. Six phases run strictly in order, each reading
what the previous phases produced:

  Data Collection → Financial Modeling → Risk Assessment →
  Deal Structuring → Covenant Design → Writing

EXAMPLES:
  # Run from an argument, streaming NDJSON events to stdout
  dealmemo run "Analyze Acme Corp" --output memo.json

  # Read the request from stdin and attach a pitch deck
  echo "Analyze Acme Corp" | dealmemo run --attach deck.pdf --output memo.json

  # Resume from the last-good document of a failed run
  dealmemo run "Analyze Acme Corp" --document memo.json --output memo.json

  # Human-readable progress, Anthropic backend
  dealmemo --provider anthropic run "Analyze Acme Corp" --events text

  # Show configuration with sources, and the resolved phase plan
  dealmemo config
  dealmemo phases --json

CONFIGURATION:
  Precedence: CLI flags > environment (DEALMEMO_LLM_PROVIDER) > config file > defaults
  The config file is discovered by searching upward from CWD for .dealmemo/config.toml
  Use --config to specify an explicit config file path
  API keys are read from GEMINI_API_KEY / ANTHROPIC_API_KEY unless configured otherwise
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// LLM provider to use (gemini, anthropic)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model to use for every phase without its own override
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Phase timeout in seconds (default: 600, min: 5)
    #[arg(long, global = true)]
    pub phase_timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run all six phases and write the memorandum
    ///
    /// Events are printed to stdout as they happen. The final document is
    /// written as canonical JSON to --output, or to stdout when no output
    /// path is given. On failure the last-good document is still written to
    /// --output so it can be passed back with --document.
    ///
    /// EXAMPLES:
    ///   dealmemo run "Analyze Acme Corp" --output memo.json
    ///   dealmemo run --attach deck.pdf --attach model.xlsx < request.txt
    Run {
        /// The request text; read from stdin when omitted
        request: Option<String>,

        /// File to hand to Data Collection (repeatable)
        #[arg(long = "attach", value_name = "FILE")]
        attachments: Vec<PathBuf>,

        /// Previously generated document to resume from
        #[arg(long, value_name = "PATH")]
        document: Option<PathBuf>,

        /// Where to write the final document (atomically)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Event output format
        #[arg(long, value_enum, default_value_t = EventFormat::Ndjson)]
        events: EventFormat,

        /// Skip the post-run confirmation call
        #[arg(long)]
        no_confirm: bool,
    },

    /// Show the effective configuration with source attribution
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved phase plan: models, timeouts and invocation profiles
    Phases {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// How `run` prints progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventFormat {
    /// One JSON object per line
    Ndjson,
    /// One human-readable line per event
    Text,
}

/// Build the clap command (for completions and doc checks).
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}

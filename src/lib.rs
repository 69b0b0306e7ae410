//! dealmemo - credit memorandum generation in six LLM phases
//!
//! A free-text request ("Analyze Acme Corp") and optional attachments go in;
//! a structured credit memorandum comes out. Six phases run in order (Data
//! Collection, Financial Modeling, Risk Assessment, Deal Structuring,
//! Covenant Design, Writing), each contributing its own slice of the
//! document, with progress streamed as events.
//!
//! dealmemo can be used in two ways:
//! - **CLI**: `dealmemo run "Analyze Acme Corp" --output memo.json`
//! - **Library**: embed [`OrchestratorHandle`] in your own service
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! dealmemo run "Analyze Acme Corp" --attach deck.pdf --output memo.json
//!
//! # Resume from a partial document after a failure
//! dealmemo run "Analyze Acme Corp" --document memo.json --output memo.json
//!
//! # Inspect configuration and the resolved phase plan
//! dealmemo config
//! dealmemo phases --json
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use dealmemo::{Config, CliArgs, OrchestratorHandle, WorkflowRequest};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let handle = OrchestratorHandle::from_config(&config)?;
//!
//! let (events, outcome) = handle
//!     .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
//!     .await;
//! for event in &events {
//!     println!("{} {}: {}", event.phase, event.status, event.message);
//! }
//! let memo = outcome?;
//! println!("{}", dealmemo::emit_jcs(&memo)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Stable Public API
//!
//! - [`OrchestratorHandle`], [`WorkflowRequest`], [`WorkflowEvent`] - running workflows
//! - [`Document`], [`DocumentPatch`], [`merge`] - the memorandum and its merge rule
//! - [`Config`] and [`ConfigBuilder`] - configuration management
//! - [`DealmemoError`] and [`ExitCode`] - error reporting
//! - [`emit_jcs`] - JCS canonical JSON emission
//!
//! Component crates are reachable through the hidden module re-exports but
//! are not covered by semver guarantees.

// ============================================================================
// Stable Public API
// ============================================================================

pub use dealmemo_orchestrator::{
    Confirmation, EventStatus, OrchestratorConfig, OrchestratorHandle, PhaseTimeout,
    WorkflowEvent, WorkflowFailure, WorkflowRequest, WorkflowRun, planned_events,
};

/// Phase identifiers in run order.
pub use dealmemo_utils::types::PhaseId;

/// The memorandum, its partial updates, and the field-wise merge.
pub use dealmemo_document::{Document, DocumentPatch, emit_jcs, merge};

/// Binary inputs for Data Collection.
pub use dealmemo_llm::Attachment;

/// Configuration for dealmemo operations.
///
/// Use [`Config::discover()`] for CLI-like behavior or [`Config::builder()`]
/// for programmatic configuration in embedding scenarios.
pub use dealmemo_config::{CliArgs, Config, ConfigBuilder};

/// Library-level error type with user-facing rendering and exit-code mapping.
pub use dealmemo_utils::error::{DealmemoError, ErrorCategory, UserFriendlyError};

pub use dealmemo_utils::exit_codes::ExitCode;

// ============================================================================
// Internal modules - accessible but not stable
// ============================================================================

pub mod cli;

#[doc(hidden)]
pub use dealmemo_config as config;
#[doc(hidden)]
pub use dealmemo_document as document;
#[doc(hidden)]
pub use dealmemo_llm as llm;
#[doc(hidden)]
pub use dealmemo_phases as phases;
#[doc(hidden)]
pub use dealmemo_utils::{error, logging, redaction, types};

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub use dealmemo_utils::test_support;

/// Returns the dealmemo version string.
#[must_use]
pub fn dealmemo_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Orchestrator for credit-memorandum workflows
//!
//! This crate drives the six phases in order against one backend, merges
//! each phase's patch into the run's document, and streams progress events
//! to the caller.
//!
//! # Module Organization
//!
//! - `handle.rs`: Stable facade API for external consumers
//! - `workflow.rs`: Multi-phase loop, merge, failure short-circuit
//! - `phase_exec.rs`: Single-phase execution with timeout and cancellation
//! - `llm.rs`: Invocation construction
//! - `events.rs`: The event audit trail
//! - `config.rs`: Resolved per-phase settings
//!
//! # Integration Rule
//!
//! **Outside this crate, use `OrchestratorHandle`.**
//!
//! # Concurrency
//!
//! A run is one Tokio task that owns its document. Its only suspension
//! point per phase is the backend call, which is spawned separately and
//! raced against the run's `CancellationToken` and the phase timeout. Runs
//! share nothing but the stateless backend.

mod config;
mod events;
mod handle;
mod llm;
mod phase_exec;
mod workflow;

pub use config::{CallSettings, OrchestratorConfig, PhaseTimeout};
pub use events::{EventStatus, ORCHESTRATOR_AGENT, WorkflowEvent, planned_events};
pub use handle::{Confirmation, OrchestratorHandle, WorkflowRun};
pub use workflow::{WorkflowFailure, WorkflowRequest};

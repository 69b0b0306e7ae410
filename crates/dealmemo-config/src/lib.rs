//! Configuration management for dealmemo
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. Configuration files are TOML with
//! `[defaults]`, `[llm]` and `[phases]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use dealmemo_utils::types::ConfigSource;
pub use discovery::{HOME_ENV, PROVIDER_ENV};
pub use model::*;

use dealmemo_utils::types::PhaseId;

impl Config {
    /// Selected LLM provider name.
    #[must_use]
    pub fn provider(&self) -> &str {
        self.llm.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    /// Get the model override for a specific phase.
    ///
    /// Precedence (highest to lowest):
    /// 1. Phase-specific override (`[phases.<phase>].model`)
    /// 2. Global default (`[defaults].model`)
    ///
    /// `None` means the backend's configured model is used.
    #[must_use]
    pub fn model_for_phase(&self, phase: PhaseId) -> Option<String> {
        self.phases
            .get(phase)
            .and_then(|pc| pc.model.clone())
            .or_else(|| self.defaults.model.clone())
    }

    /// Model override for the confirmation call, same precedence as phases.
    #[must_use]
    pub fn model_for_confirmation(&self) -> Option<String> {
        self.phases
            .confirmation
            .as_ref()
            .and_then(|pc| pc.model.clone())
            .or_else(|| self.defaults.model.clone())
    }

    /// Time bound for one phase's backend call, in seconds.
    ///
    /// Phase-specific `phase_timeout` wins over `[defaults].phase_timeout`.
    #[must_use]
    pub fn timeout_for_phase(&self, phase: PhaseId) -> u64 {
        self.phases
            .get(phase)
            .and_then(|pc| pc.phase_timeout)
            .or(self.defaults.phase_timeout)
            .unwrap_or(DEFAULT_PHASE_TIMEOUT_SECS)
    }

    /// Time bound for the confirmation call, in seconds.
    #[must_use]
    pub fn timeout_for_confirmation(&self) -> u64 {
        self.phases
            .confirmation
            .as_ref()
            .and_then(|pc| pc.phase_timeout)
            .or(self.defaults.phase_timeout)
            .unwrap_or(DEFAULT_PHASE_TIMEOUT_SECS)
    }

    /// Capacity of the per-run event channel.
    #[must_use]
    pub fn event_buffer(&self) -> usize {
        self.defaults.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    /// Whether logs should be emitted as JSON lines.
    #[must_use]
    pub fn log_json(&self) -> bool {
        self.defaults.log_format.as_deref() == Some("json")
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Create a minimal Config for testing purposes
    ///
    /// Defaults only, no discovery, no environment.
    pub fn minimal_for_testing() -> Self {
        Config {
            defaults: Defaults::default(),
            llm: LlmConfig {
                provider: Some(DEFAULT_PROVIDER.to_string()),
                ..LlmConfig::default()
            },
            phases: PhasesConfig::default(),
            source_attribution: std::collections::HashMap::new(),
        }
    }
}

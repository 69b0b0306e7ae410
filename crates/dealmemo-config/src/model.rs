use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use dealmemo_utils::error::ConfigError;
use dealmemo_utils::types::{ConfigSource, PhaseId, ToolCapability};

/// Default bound on a single phase's backend call, in seconds
pub const DEFAULT_PHASE_TIMEOUT_SECS: u64 = 600;

/// Default capacity of the per-run event channel
pub const DEFAULT_EVENT_BUFFER: usize = 32;

/// Provider used when neither CLI, environment nor file names one
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Providers the backend factory knows how to construct
pub const KNOWN_PROVIDERS: &[&str] = &["gemini", "anthropic"];

/// Configuration for dealmemo runs.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > environment > config file > built-in defaults.
///
/// # Discovery
///
/// Use [`Config::discover()`] for CLI-like behavior that:
/// - Uses `$DEALMEMO_HOME/config.toml` when `DEALMEMO_HOME` is set
/// - Otherwise searches for `.dealmemo/config.toml` upward from the current directory
/// - Applies built-in defaults for unspecified values
///
/// For embedding, build one with [`Config::builder()`].
///
/// # Configuration File Format
///
/// ```toml
/// [defaults]
/// model = "gemini-2.5-pro"
/// phase_timeout = 600
/// event_buffer = 32
///
/// [llm]
/// provider = "anthropic"
/// fallback_provider = "gemini"
///
/// [llm.anthropic]
/// api_key_env = "ANTHROPIC_API_KEY"
/// model = "claude-sonnet-4-5"
///
/// [phases.financial_modeling]
/// token_budget = 24000
/// tools = ["code_execution", "spreadsheets"]
///
/// [phases.confirmation]
/// temperature = 0.4
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Default values for various settings.
    pub defaults: Defaults,
    /// LLM provider configuration.
    pub llm: LlmConfig,
    /// Per-phase invocation profile overrides.
    pub phases: PhasesConfig,
    /// Source attribution for each setting (for `dealmemo config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// Default configuration values
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Model used by every phase without its own `model`. Unset means the
    /// backend's own default model.
    pub model: Option<String>,
    pub phase_timeout: Option<u64>,
    pub event_buffer: Option<usize>,
    pub verbose: Option<bool>,
    /// `text` or `json`
    pub log_format: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: None,
            phase_timeout: Some(DEFAULT_PHASE_TIMEOUT_SECS),
            event_buffer: Some(DEFAULT_EVENT_BUFFER),
            verbose: Some(false),
            log_format: Some("text".to_string()),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub fallback_provider: Option<String>,
    pub gemini: Option<ProviderConfig>,
    pub anthropic: Option<ProviderConfig>,
}

/// Settings for one HTTP provider (`[llm.gemini]`, `[llm.anthropic]`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Per-phase invocation profile overrides.
///
/// Every field falls back to the phase's built-in profile when unset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PhaseProfileConfig {
    pub model: Option<String>,
    pub reasoning: Option<bool>,
    pub temperature: Option<f32>,
    pub token_budget: Option<u32>,
    /// Replaces the built-in tool set when present; `[]` disables tools.
    pub tools: Option<Vec<String>>,
    pub phase_timeout: Option<u64>,
}

impl PhaseProfileConfig {
    /// Parse the configured tool names.
    ///
    /// Returns `Ok(None)` when no override is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first unknown tool.
    pub fn tool_set(&self) -> Result<Option<BTreeSet<ToolCapability>>, ConfigError> {
        let Some(names) = &self.tools else {
            return Ok(None);
        };
        names
            .iter()
            .map(|name| {
                ToolCapability::from_str(name.trim()).map_err(|_| ConfigError::InvalidValue {
                    key: "tools".to_string(),
                    value: format!("unknown tool '{name}'"),
                })
            })
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Some)
    }
}

/// Phase-specific configuration section
///
/// ```toml
/// [phases.writing]
/// temperature = 0.6
///
/// [phases.risk_assessment]
/// reasoning = false
/// temperature = 0.3
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PhasesConfig {
    pub data_collection: Option<PhaseProfileConfig>,
    pub financial_modeling: Option<PhaseProfileConfig>,
    pub risk_assessment: Option<PhaseProfileConfig>,
    pub deal_structuring: Option<PhaseProfileConfig>,
    pub covenant_design: Option<PhaseProfileConfig>,
    pub writing: Option<PhaseProfileConfig>,
    /// The post-run confirmation call
    pub confirmation: Option<PhaseProfileConfig>,
}

impl PhasesConfig {
    /// Override section for a phase, if configured
    #[must_use]
    pub fn get(&self, phase: PhaseId) -> Option<&PhaseProfileConfig> {
        match phase {
            PhaseId::DataCollection => self.data_collection.as_ref(),
            PhaseId::FinancialModeling => self.financial_modeling.as_ref(),
            PhaseId::RiskAssessment => self.risk_assessment.as_ref(),
            PhaseId::DealStructuring => self.deal_structuring.as_ref(),
            PhaseId::CovenantDesign => self.covenant_design.as_ref(),
            PhaseId::Writing => self.writing.as_ref(),
        }
    }

    /// Mutable slot for a phase's override section
    pub fn slot_mut(&mut self, phase: PhaseId) -> &mut Option<PhaseProfileConfig> {
        match phase {
            PhaseId::DataCollection => &mut self.data_collection,
            PhaseId::FinancialModeling => &mut self.financial_modeling,
            PhaseId::RiskAssessment => &mut self.risk_assessment,
            PhaseId::DealStructuring => &mut self.deal_structuring,
            PhaseId::CovenantDesign => &mut self.covenant_design,
            PhaseId::Writing => &mut self.writing,
        }
    }

    /// Every configured section with its config key, confirmation last
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &PhaseProfileConfig)> {
        PhaseId::ALL
            .iter()
            .filter_map(|phase| self.get(*phase).map(|cfg| (phase.as_str(), cfg)))
            .chain(self.confirmation.as_ref().map(|cfg| ("confirmation", cfg)))
    }
}

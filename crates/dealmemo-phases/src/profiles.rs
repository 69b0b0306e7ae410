//! Per-phase invocation profiles and their config overrides.

use std::collections::BTreeSet;

use dealmemo_config::{Config, PhaseProfileConfig};
use dealmemo_phase_api::{InvocationProfile, PhaseId};
use dealmemo_utils::error::ConfigError;
use dealmemo_utils::types::ToolCapability;
use serde::Serialize;
use tracing::{debug, warn};

/// Built-in profile for a phase.
///
/// | phase | reasoning | temperature | budget | tools |
/// |---|---|---|---|---|
/// | data_collection | off | 0.2 | 8192 | web_search, documents |
/// | financial_modeling | on | - | 16000 | code_execution, spreadsheets |
/// | risk_assessment | on | - | 8192 | - |
/// | deal_structuring | off | 0.3 | 8192 | - |
/// | covenant_design | off | 0.2 | 8192 | - |
/// | writing | off | 0.7 | 16000 | - |
#[must_use]
pub fn default_profile(phase: PhaseId) -> InvocationProfile {
    let (reasoning, temperature, token_budget, tools): (bool, Option<f32>, u32, &[ToolCapability]) =
        match phase {
            PhaseId::DataCollection => (
                false,
                Some(0.2),
                8192,
                &[ToolCapability::WebSearch, ToolCapability::Documents],
            ),
            PhaseId::FinancialModeling => (
                true,
                None,
                16000,
                &[ToolCapability::CodeExecution, ToolCapability::Spreadsheets],
            ),
            PhaseId::RiskAssessment => (true, None, 8192, &[]),
            PhaseId::DealStructuring => (false, Some(0.3), 8192, &[]),
            PhaseId::CovenantDesign => (false, Some(0.2), 8192, &[]),
            PhaseId::Writing => (false, Some(0.7), 16000, &[]),
        };
    InvocationProfile {
        reasoning,
        temperature,
        token_budget,
        tools: tools.iter().copied().collect(),
        json_output: true,
    }
}

/// Built-in profile for the post-run confirmation call: plain text, no tools.
#[must_use]
pub fn confirmation_profile() -> InvocationProfile {
    InvocationProfile {
        reasoning: false,
        temperature: Some(0.5),
        token_budget: 1024,
        tools: BTreeSet::new(),
        json_output: false,
    }
}

/// Phase profile with `[phases.<phase>]` overrides applied.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for unknown tool names.
pub fn resolve_profile(config: &Config, phase: PhaseId) -> Result<InvocationProfile, ConfigError> {
    apply_overrides(default_profile(phase), config.phases.get(phase), phase.as_str())
}

/// Confirmation profile with `[phases.confirmation]` overrides applied.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` for unknown tool names.
pub fn resolve_confirmation_profile(config: &Config) -> Result<InvocationProfile, ConfigError> {
    apply_overrides(
        confirmation_profile(),
        config.phases.confirmation.as_ref(),
        "confirmation",
    )
}

fn apply_overrides(
    base: InvocationProfile,
    overrides: Option<&PhaseProfileConfig>,
    section: &str,
) -> Result<InvocationProfile, ConfigError> {
    let Some(cfg) = overrides else {
        return Ok(base);
    };
    let resolved = base.clone().with_overrides(Some(cfg)).map_err(|e| {
        let e = prefix_key(e, section);
        warn!(%section, error = %e, "Rejected profile override");
        e
    })?;
    if resolved != base {
        debug!(
            %section,
            reasoning = resolved.reasoning,
            temperature = ?resolved.temperature,
            token_budget = resolved.token_budget,
            tools = resolved.tools.len(),
            "Applied profile overrides"
        );
    }
    Ok(resolved)
}

fn prefix_key(error: ConfigError, section: &str) -> ConfigError {
    match error {
        ConfigError::InvalidValue { key, value } => ConfigError::InvalidValue {
            key: format!("phases.{section}.{key}"),
            value,
        },
        other => other,
    }
}

/// One row of the resolved phase plan, as printed by `dealmemo phases`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedPhase {
    /// Phase name, or `confirmation`
    pub phase: String,
    pub label: String,
    /// Model override; `None` means the provider's configured model
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub reasoning: bool,
    pub temperature: Option<f32>,
    pub token_budget: u32,
    pub tools: Vec<String>,
}

/// Resolve every phase plus the confirmation call against `config`.
///
/// # Errors
///
/// Returns the first profile resolution error.
pub fn plan(config: &Config) -> Result<Vec<PlannedPhase>, ConfigError> {
    let mut rows = Vec::with_capacity(PhaseId::ALL.len() + 1);
    for phase in PhaseId::ALL {
        let profile = resolve_profile(config, phase)?;
        rows.push(planned(
            phase.as_str(),
            phase.label(),
            config.model_for_phase(phase),
            config.timeout_for_phase(phase),
            &profile,
        ));
    }
    let confirmation = resolve_confirmation_profile(config)?;
    rows.push(planned(
        "confirmation",
        "Confirmation",
        config.model_for_confirmation(),
        config.timeout_for_confirmation(),
        &confirmation,
    ));
    Ok(rows)
}

fn planned(
    phase: &str,
    label: &str,
    model: Option<String>,
    timeout_secs: u64,
    profile: &InvocationProfile,
) -> PlannedPhase {
    PlannedPhase {
        phase: phase.to_string(),
        label: label.to_string(),
        model,
        timeout_secs,
        reasoning: profile.reasoning,
        temperature: profile.temperature,
        token_budget: profile.token_budget,
        tools: profile.tools.iter().map(ToString::to_string).collect(),
    }
}

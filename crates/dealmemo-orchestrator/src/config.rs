//! Resolved per-run settings: models, time bounds and invocation profiles.

use std::collections::HashMap;
use std::time::Duration;

use dealmemo_config::{Config, DEFAULT_EVENT_BUFFER};
use dealmemo_phase_api::{InvocationProfile, PhaseId};
use dealmemo_phases::{
    confirmation_profile, default_profile, resolve_confirmation_profile, resolve_profile,
};
use dealmemo_utils::error::ConfigError;

/// Phase timeout configuration with sensible defaults.
///
/// Enforces minimum and default timeout values to prevent
/// runaway backend calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimeout {
    /// Bound on the phase's backend call
    pub duration: Duration,
}

impl PhaseTimeout {
    /// Default timeout in seconds (10 minutes)
    pub const DEFAULT_SECS: u64 = 600;

    /// Minimum timeout in seconds (5 seconds)
    pub const MIN_SECS: u64 = 5;

    /// Create a `PhaseTimeout` with a specific duration in seconds
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        let timeout_secs = secs.max(Self::MIN_SECS);
        Self {
            duration: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for PhaseTimeout {
    fn default() -> Self {
        Self::from_secs(Self::DEFAULT_SECS)
    }
}

/// Everything needed to issue one call: model, bound, and backend profile.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSettings {
    /// Model override; empty means the backend's configured model
    pub model: String,
    pub timeout: PhaseTimeout,
    pub profile: InvocationProfile,
}

/// Orchestrator configuration, resolved once per handle.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    phases: HashMap<PhaseId, CallSettings>,
    confirmation: CallSettings,
    /// Capacity of the bounded event channel
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    /// Built-in profiles, backend default models, 600 s bounds.
    fn default() -> Self {
        let phases = PhaseId::ALL
            .into_iter()
            .map(|phase| {
                let settings = CallSettings {
                    model: String::new(),
                    timeout: PhaseTimeout::default(),
                    profile: default_profile(phase),
                };
                (phase, settings)
            })
            .collect();
        Self {
            phases,
            confirmation: CallSettings {
                model: String::new(),
                timeout: PhaseTimeout::default(),
                profile: confirmation_profile(),
            },
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl OrchestratorConfig {
    /// Resolve every phase and the confirmation call against `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a `[phases.*]` section names
    /// an unknown tool.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut phases = HashMap::with_capacity(PhaseId::ALL.len());
        for phase in PhaseId::ALL {
            phases.insert(
                phase,
                CallSettings {
                    model: config.model_for_phase(phase).unwrap_or_default(),
                    timeout: PhaseTimeout::from_secs(config.timeout_for_phase(phase)),
                    profile: resolve_profile(config, phase)?,
                },
            );
        }
        Ok(Self {
            phases,
            confirmation: CallSettings {
                model: config.model_for_confirmation().unwrap_or_default(),
                timeout: PhaseTimeout::from_secs(config.timeout_for_confirmation()),
                profile: resolve_confirmation_profile(config)?,
            },
            event_buffer: config.event_buffer().max(1),
        })
    }

    /// Settings for one phase's call.
    #[must_use]
    pub fn phase(&self, phase: PhaseId) -> &CallSettings {
        // Both constructors populate every phase.
        &self.phases[&phase]
    }

    #[must_use]
    pub fn confirmation(&self) -> &CallSettings {
        &self.confirmation
    }

    /// Apply the same time bound to every phase and the confirmation call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: PhaseTimeout) -> Self {
        for settings in self.phases.values_mut() {
            settings.timeout = timeout;
        }
        self.confirmation.timeout = timeout;
        self
    }

    /// Override the time bound of a single phase.
    #[must_use]
    pub fn with_phase_timeout(mut self, phase: PhaseId, timeout: PhaseTimeout) -> Self {
        if let Some(settings) = self.phases.get_mut(&phase) {
            settings.timeout = timeout;
        }
        self
    }

    #[must_use]
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealmemo_config::PhaseProfileConfig;

    #[test]
    fn test_phase_timeout_enforces_minimum() {
        assert_eq!(PhaseTimeout::from_secs(1).duration, Duration::from_secs(5));
        assert_eq!(PhaseTimeout::from_secs(90).duration, Duration::from_secs(90));
        assert_eq!(PhaseTimeout::default().duration, Duration::from_secs(600));
    }

    #[test]
    fn test_default_uses_builtin_profiles() {
        let cfg = OrchestratorConfig::default();
        for phase in PhaseId::ALL {
            assert_eq!(cfg.phase(phase).profile, default_profile(phase));
            assert!(cfg.phase(phase).model.is_empty());
        }
        assert!(!cfg.confirmation().profile.json_output);
        assert_eq!(cfg.event_buffer, 32);
    }

    #[test]
    fn test_from_config_applies_phase_overrides() {
        let mut config = Config::minimal_for_testing();
        config.phases.risk_assessment = Some(PhaseProfileConfig {
            model: Some("claude-opus-4-1".into()),
            phase_timeout: Some(120),
            reasoning: Some(false),
            temperature: Some(0.1),
            ..Default::default()
        });

        let cfg = OrchestratorConfig::from_config(&config).unwrap();
        let risk = cfg.phase(PhaseId::RiskAssessment);
        assert_eq!(risk.model, "claude-opus-4-1");
        assert_eq!(risk.timeout.duration, Duration::from_secs(120));
        assert!(!risk.profile.reasoning);
        assert_eq!(risk.profile.temperature, Some(0.1));

        let writing = cfg.phase(PhaseId::Writing);
        assert_eq!(writing.timeout.duration, Duration::from_secs(600));
    }

    #[test]
    fn test_with_phase_timeout_touches_one_phase() {
        let cfg = OrchestratorConfig::default()
            .with_phase_timeout(PhaseId::DealStructuring, PhaseTimeout::from_secs(30));
        assert_eq!(
            cfg.phase(PhaseId::DealStructuring).timeout.duration,
            Duration::from_secs(30)
        );
        assert_eq!(
            cfg.phase(PhaseId::CovenantDesign).timeout.duration,
            Duration::from_secs(600)
        );
    }
}

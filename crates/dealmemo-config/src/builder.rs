use std::collections::HashMap;
use std::time::Duration;

use dealmemo_utils::error::ConfigError;
use dealmemo_utils::types::PhaseId;

use super::{Config, ConfigSource, Defaults, LlmConfig, PhaseProfileConfig, PhasesConfig};
use crate::model::{DEFAULT_PROVIDER, ProviderConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding dealmemo and the result must not depend on
    /// environment variables or config files.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dealmemo_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .llm_provider("anthropic")
    ///     .phase_timeout(Duration::from_secs(300))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.provider(), "anthropic");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    model: Option<String>,
    phase_timeout: Option<Duration>,
    event_buffer: Option<usize>,
    verbose: Option<bool>,
    llm_provider: Option<String>,
    fallback_provider: Option<String>,
    gemini: Option<ProviderConfig>,
    anthropic: Option<ProviderConfig>,
    phases: PhasesConfig,
    phases_touched: bool,
}

impl ConfigBuilder {
    /// Create a new `ConfigBuilder` with no values set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default model for every phase.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the default per-phase time bound (whole seconds are kept).
    #[must_use]
    pub fn phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = Some(timeout);
        self
    }

    /// Set the capacity of the event channel.
    #[must_use]
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Set the LLM provider (`gemini` or `anthropic`).
    #[must_use]
    pub fn llm_provider(mut self, provider: impl Into<String>) -> Self {
        self.llm_provider = Some(provider.into());
        self
    }

    /// Provider tried when the primary cannot be constructed.
    #[must_use]
    pub fn fallback_provider(mut self, provider: impl Into<String>) -> Self {
        self.fallback_provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn gemini(mut self, settings: ProviderConfig) -> Self {
        self.gemini = Some(settings);
        self
    }

    #[must_use]
    pub fn anthropic(mut self, settings: ProviderConfig) -> Self {
        self.anthropic = Some(settings);
        self
    }

    /// Override the invocation profile of one phase.
    #[must_use]
    pub fn phase(mut self, phase: PhaseId, profile: PhaseProfileConfig) -> Self {
        *self.phases.slot_mut(phase) = Some(profile);
        self.phases_touched = true;
        self
    }

    /// Override the confirmation call's profile.
    #[must_use]
    pub fn confirmation(mut self, profile: PhaseProfileConfig) -> Self {
        self.phases.confirmation = Some(profile);
        self.phases_touched = true;
        self
    }

    /// Build the `Config` from the builder values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when the resulting configuration
    /// fails validation (e.g. a phase timeout under 5 seconds).
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let src = ConfigSource::Programmatic;

        let mut defaults = Defaults::default();
        for key in ["phase_timeout", "event_buffer", "verbose", "log_format"] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        if let Some(model) = self.model {
            defaults.model = Some(model);
            source_attribution.insert("model".to_string(), src);
        }
        if let Some(timeout) = self.phase_timeout {
            defaults.phase_timeout = Some(timeout.as_secs());
            source_attribution.insert("phase_timeout".to_string(), src);
        }
        if let Some(capacity) = self.event_buffer {
            defaults.event_buffer = Some(capacity);
            source_attribution.insert("event_buffer".to_string(), src);
        }
        if let Some(verbose) = self.verbose {
            defaults.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), src);
        }

        let mut llm = LlmConfig {
            provider: None,
            fallback_provider: self.fallback_provider,
            gemini: self.gemini,
            anthropic: self.anthropic,
        };
        if let Some(provider) = self.llm_provider {
            llm.provider = Some(provider);
            source_attribution.insert("llm_provider".to_string(), src);
        } else {
            llm.provider = Some(DEFAULT_PROVIDER.to_string());
            source_attribution.insert("llm_provider".to_string(), ConfigSource::Default);
        }
        if llm.fallback_provider.is_some() {
            source_attribution.insert("llm_fallback_provider".to_string(), src);
        }
        if llm.gemini.is_some() {
            source_attribution.insert("llm_gemini".to_string(), src);
        }
        if llm.anthropic.is_some() {
            source_attribution.insert("llm_anthropic".to_string(), src);
        }
        if self.phases_touched {
            source_attribution.insert("phases".to_string(), src);
        }

        let config = Config {
            defaults,
            llm,
            phases: self.phases,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }
}

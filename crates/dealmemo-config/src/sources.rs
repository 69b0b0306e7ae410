use std::collections::HashMap;

use super::Config;
use super::ConfigSource;

fn source_label(source: Option<&ConfigSource>) -> String {
    source.unwrap_or(&ConfigSource::Default).as_str().to_string()
}

impl Config {
    /// Get effective configuration as key-value pairs with source attribution.
    ///
    /// Values are `(value, source)`; phase overrides appear flattened as
    /// `phases.<phase>.<field>`.
    #[must_use]
    pub fn effective_config(&self) -> HashMap<String, (String, String)> {
        let mut config = HashMap::new();

        let mut add = |key: &str, attribution_key: &str, value: Option<String>| {
            if let Some(val) = value {
                let source = source_label(self.source_attribution.get(attribution_key));
                config.insert(key.to_string(), (val, source));
            }
        };

        add("model", "model", self.defaults.model.clone());
        add(
            "phase_timeout",
            "phase_timeout",
            self.defaults.phase_timeout.map(|v| v.to_string()),
        );
        add(
            "event_buffer",
            "event_buffer",
            self.defaults.event_buffer.map(|v| v.to_string()),
        );
        add(
            "verbose",
            "verbose",
            self.defaults.verbose.map(|v| v.to_string()),
        );
        add("log_format", "log_format", self.defaults.log_format.clone());
        add("llm.provider", "llm_provider", self.llm.provider.clone());
        add(
            "llm.fallback_provider",
            "llm_fallback_provider",
            self.llm.fallback_provider.clone(),
        );

        for (name, provider) in [("gemini", &self.llm.gemini), ("anthropic", &self.llm.anthropic)] {
            let Some(provider) = provider else { continue };
            let attribution = format!("llm_{name}");
            add(
                &format!("llm.{name}.api_key_env"),
                &attribution,
                provider.api_key_env.clone(),
            );
            add(
                &format!("llm.{name}.base_url"),
                &attribution,
                provider.base_url.clone(),
            );
            add(&format!("llm.{name}.model"), &attribution, provider.model.clone());
        }

        for (section, profile) in self.phases.sections() {
            let prefix = format!("phases.{section}");
            add(&format!("{prefix}.model"), "phases", profile.model.clone());
            add(
                &format!("{prefix}.reasoning"),
                "phases",
                profile.reasoning.map(|v| v.to_string()),
            );
            add(
                &format!("{prefix}.temperature"),
                "phases",
                profile.temperature.map(|v| v.to_string()),
            );
            add(
                &format!("{prefix}.token_budget"),
                "phases",
                profile.token_budget.map(|v| v.to_string()),
            );
            add(
                &format!("{prefix}.tools"),
                "phases",
                profile.tools.as_ref().map(|tools| tools.join(", ")),
            );
            add(
                &format!("{prefix}.phase_timeout"),
                "phases",
                profile.phase_timeout.map(|v| v.to_string()),
            );
        }

        config
    }
}

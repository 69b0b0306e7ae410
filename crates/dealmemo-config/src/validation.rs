use dealmemo_utils::error::ConfigError;

use super::{Config, PhaseProfileConfig};
use crate::model::KNOWN_PROVIDERS;

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    }
}

fn validate_timeout(key: &str, secs: u64) -> Result<(), ConfigError> {
    if secs < 5 {
        return Err(invalid(key, "must be at least 5 seconds"));
    }
    if secs > 7200 {
        return Err(invalid(
            key,
            "exceeds maximum limit of 7200 seconds (2 hours)",
        ));
    }
    Ok(())
}

fn validate_provider(key: &str, provider: &str) -> Result<(), ConfigError> {
    if KNOWN_PROVIDERS.contains(&provider) {
        Ok(())
    } else {
        Err(invalid(
            key,
            format!("'{provider}' is not valid. Must be one of: {}", KNOWN_PROVIDERS.join(", ")),
        ))
    }
}

fn validate_profile(section: &str, profile: &PhaseProfileConfig) -> Result<(), ConfigError> {
    if let Some(temperature) = profile.temperature
        && !(0.0..=2.0).contains(&temperature)
    {
        return Err(invalid(
            format!("phases.{section}.temperature"),
            format!("{temperature} is outside 0.0..=2.0"),
        ));
    }
    if let Some(budget) = profile.token_budget
        && !(256..=64_000).contains(&budget)
    {
        return Err(invalid(
            format!("phases.{section}.token_budget"),
            format!("{budget} is outside 256..=64000"),
        ));
    }
    if let Some(timeout) = profile.phase_timeout {
        validate_timeout(&format!("phases.{section}.phase_timeout"), timeout)?;
    }
    if let Some(model) = &profile.model
        && model.trim().is_empty()
    {
        return Err(invalid(format!("phases.{section}.model"), "must not be empty"));
    }
    profile.tool_set().map_err(|err| match err {
        ConfigError::InvalidValue { value, .. } => invalid(format!("phases.{section}.tools"), value),
        other => other,
    })?;
    Ok(())
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(phase_timeout) = self.defaults.phase_timeout {
            validate_timeout("phase_timeout", phase_timeout)?;
        }

        if let Some(buffer) = self.defaults.event_buffer
            && !(1..=1024).contains(&buffer)
        {
            return Err(invalid("event_buffer", format!("{buffer} is outside 1..=1024")));
        }

        if let Some(format) = &self.defaults.log_format {
            match format.as_str() {
                "text" | "json" => {}
                _ => {
                    return Err(invalid(
                        "log_format",
                        format!("'{format}' is not valid. Must be 'text' or 'json'"),
                    ));
                }
            }
        }

        if let Some(model) = &self.defaults.model
            && model.trim().is_empty()
        {
            return Err(invalid("model", "must not be empty"));
        }

        if let Some(provider) = &self.llm.provider {
            validate_provider("llm.provider", provider)?;
        }
        if let Some(fallback) = &self.llm.fallback_provider {
            validate_provider("llm.fallback_provider", fallback)?;
        }

        for (section, profile) in self.phases.sections() {
            validate_profile(section, profile)?;
        }

        Ok(())
    }
}

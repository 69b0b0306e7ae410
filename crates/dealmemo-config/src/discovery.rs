use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{CliArgs, Config, ConfigSource, Defaults, LlmConfig, PhasesConfig};
use crate::model::DEFAULT_PROVIDER;

/// Environment variable naming an explicit config directory
pub const HOME_ENV: &str = "DEALMEMO_HOME";

/// Environment variable overriding `[llm].provider`
pub const PROVIDER_ENV: &str = "DEALMEMO_LLM_PROVIDER";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlConfig {
    defaults: Option<Defaults>,
    llm: Option<LlmConfig>,
    phases: Option<PhasesConfig>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined, a
    /// config file exists but cannot be parsed, or validation fails.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// This is the path-driven variant used by tests to avoid depending on the
    /// process working directory.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut source_attribution = HashMap::new();

        let mut defaults = Defaults::default();
        let mut llm = LlmConfig::default();
        let mut phases = PhasesConfig::default();

        for key in ["phase_timeout", "event_buffer", "verbose", "log_format"] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => match env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
                Some(home) => Some(PathBuf::from(home).join("config.toml")),
                None => Self::discover_config_file_from(start_dir)?,
            },
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            debug!(path = %path.display(), "Loaded configuration file");

            let src = ConfigSource::Config;

            if let Some(file_defaults) = file_config.defaults {
                if file_defaults.model.is_some() {
                    defaults.model = file_defaults.model;
                    source_attribution.insert("model".to_string(), src);
                }
                if file_defaults.phase_timeout.is_some() {
                    defaults.phase_timeout = file_defaults.phase_timeout;
                    source_attribution.insert("phase_timeout".to_string(), src);
                }
                if file_defaults.event_buffer.is_some() {
                    defaults.event_buffer = file_defaults.event_buffer;
                    source_attribution.insert("event_buffer".to_string(), src);
                }
                if file_defaults.verbose.is_some() {
                    defaults.verbose = file_defaults.verbose;
                    source_attribution.insert("verbose".to_string(), src);
                }
                if file_defaults.log_format.is_some() {
                    defaults.log_format = file_defaults.log_format;
                    source_attribution.insert("log_format".to_string(), src);
                }
            }

            if let Some(file_llm) = file_config.llm {
                if file_llm.provider.is_some() {
                    llm.provider = file_llm.provider;
                    source_attribution.insert("llm_provider".to_string(), src);
                }
                if file_llm.fallback_provider.is_some() {
                    llm.fallback_provider = file_llm.fallback_provider;
                    source_attribution.insert("llm_fallback_provider".to_string(), src);
                }
                if file_llm.gemini.is_some() {
                    llm.gemini = file_llm.gemini;
                    source_attribution.insert("llm_gemini".to_string(), src);
                }
                if file_llm.anthropic.is_some() {
                    llm.anthropic = file_llm.anthropic;
                    source_attribution.insert("llm_anthropic".to_string(), src);
                }
            }

            if let Some(file_phases) = file_config.phases {
                phases = file_phases;
                source_attribution.insert("phases".to_string(), src);
            }
        }

        if let Ok(env_provider) = env::var(PROVIDER_ENV)
            && !env_provider.trim().is_empty()
        {
            llm.provider = Some(env_provider.trim().to_string());
            source_attribution.insert("llm_provider".to_string(), ConfigSource::Env);
        }

        // CLI overrides (highest priority)
        if let Some(provider) = &cli_args.llm_provider {
            llm.provider = Some(provider.clone());
            source_attribution.insert("llm_provider".to_string(), ConfigSource::Cli);
        }
        if let Some(model) = &cli_args.model {
            defaults.model = Some(model.clone());
            source_attribution.insert("model".to_string(), ConfigSource::Cli);
        }
        if let Some(phase_timeout) = cli_args.phase_timeout {
            defaults.phase_timeout = Some(phase_timeout);
            source_attribution.insert("phase_timeout".to_string(), ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            defaults.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }
        if let Some(true) = cli_args.log_json {
            defaults.log_format = Some("json".to_string());
            source_attribution.insert("log_format".to_string(), ConfigSource::Cli);
        }

        if llm.provider.is_none() {
            llm.provider = Some(DEFAULT_PROVIDER.to_string());
            source_attribution.insert("llm_provider".to_string(), ConfigSource::Default);
        }

        let config = Self {
            defaults,
            llm,
            phases,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.dealmemo/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".dealmemo").join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).with_context(|| {
                format!("Failed to parse TOML config file: {}", path.display())
            }),
            // Missing config file is OK - defaults apply
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        }
    }
}

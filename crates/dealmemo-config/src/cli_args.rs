use std::path::PathBuf;

/// Configuration overrides supplied on the command line.
///
/// Every field is optional; unset fields fall through to environment, file
/// and defaults.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file, bypassing discovery
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub llm_provider: Option<String>,
    pub phase_timeout: Option<u64>,
    pub verbose: Option<bool>,
    pub log_json: Option<bool>,
}

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::redaction::redact_error_message;
use crate::types::PhaseId;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `DealmemoError` is the umbrella error returned at the edges of the
/// dealmemo library (CLI, handle construction). It provides:
/// - Detailed error information for programmatic handling
/// - User-friendly messages with context and suggestions
/// - Mapping to CLI exit codes for consistent error reporting
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors, backend misconfiguration |
/// | 10 | Phase or backend timeout |
/// | 65 | Malformed phase output |
/// | 70 | Backend call failure |
/// | 130 | Run cancelled |
/// | 1 | Other errors |
///
/// Library code returns `DealmemoError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum DealmemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Backend,
    PhaseExecution,
    ResourceLimits,
    Cancellation,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Backend => write!(f, "Backend"),
            Self::PhaseExecution => write!(f, "Phase Execution"),
            Self::ResourceLimits => write!(f, "Resource Limits"),
            Self::Cancellation => write!(f, "Cancellation"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => {
                format!("Configuration file not found: {path}")
            }
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [defaults], [llm] and [phases] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => None,
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "dealmemo searches for .dealmemo/config.toml starting from the current directory upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Run 'dealmemo config' to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!(
                "Add '{key}' to .dealmemo/config.toml or pass it as a CLI flag"
            )],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "phase_timeout" => vec!["Use a value between 5 and 7200 seconds".to_string()],
                "llm.provider" | "llm.fallback_provider" => {
                    vec!["Use 'gemini' or 'anthropic'".to_string()]
                }
                k if k.ends_with(".tools") => vec![
                    "Valid tools: web_search, code_execution, spreadsheets, documents".to_string(),
                ],
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Create .dealmemo/config.toml in your project root".to_string(),
                "Use CLI flags instead of a configuration file".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check read permissions on the current and parent directories".to_string(),
                "Use --config <path> to specify the configuration file explicitly".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors that can occur during LLM backend operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, undecodable response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Request rejected before any network I/O
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl LlmError {
    /// Short, detail-free summary suitable for public event messages.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Transport(_) => "could not reach the provider".to_string(),
            Self::ProviderAuth(_) => "provider authentication failed".to_string(),
            Self::ProviderQuota(_) => "provider quota exceeded".to_string(),
            Self::ProviderOutage(_) => "provider unavailable".to_string(),
            Self::Timeout { duration } => format!("timed out after {}s", duration.as_secs()),
            Self::InvalidRequest(_) => "invalid backend request".to_string(),
            Self::Misconfiguration(_) => "backend misconfigured".to_string(),
            Self::Unsupported(_) => "unsupported backend request".to_string(),
        }
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::Timeout { duration } => {
                format!("LLM invocation timed out after {:?}", duration)
            }
            Self::InvalidRequest(msg) => format!("LLM request rejected: {msg}"),
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("LLM feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => Some(
                "Transport errors occur when the LLM backend cannot be reached or its response cannot be decoded."
                    .to_string(),
            ),
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate missing or invalid API keys.".to_string(),
            ),
            Self::ProviderQuota(_) => Some(
                "Quota errors occur when rate limits or usage limits are exceeded.".to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::Timeout { .. } => Some(
                "Timeouts occur when a phase's backend call takes longer than the configured limit."
                    .to_string(),
            ),
            Self::InvalidRequest(_) => Some(
                "Every structured-output call needs non-empty instructions and content."
                    .to_string(),
            ),
            Self::Misconfiguration(_) => Some(
                "Configuration errors indicate missing or invalid LLM provider settings."
                    .to_string(),
            ),
            Self::Unsupported(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) => vec![
                "Verify network connectivity to the provider".to_string(),
                "Try running with --verbose to see detailed error information".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the required API key environment variable is set".to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::ProviderQuota(_) | Self::ProviderOutage(_) => vec![
                "Wait a few minutes and re-run with --document pointing at the partial output"
                    .to_string(),
                "Consider switching provider with --provider".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase the timeout via --phase-timeout or [phases.<name>] phase_timeout"
                    .to_string(),
                "Lower token_budget for the slow phase".to_string(),
            ],
            Self::InvalidRequest(_) => vec!["Provide a non-empty request text".to_string()],
            Self::Misconfiguration(_) => vec![
                "Check the [llm] section of .dealmemo/config.toml".to_string(),
                "Run 'dealmemo config' to see where each value comes from".to_string(),
            ],
            Self::Unsupported(_) => vec![
                "Check the documentation for supported providers and tools".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) | Self::ProviderOutage(_) => ErrorCategory::Backend,
            Self::ProviderAuth(_) | Self::Misconfiguration(_) | Self::Unsupported(_) => {
                ErrorCategory::Configuration
            }
            Self::ProviderQuota(_) => ErrorCategory::ResourceLimits,
            Self::Timeout { .. } | Self::InvalidRequest(_) => ErrorCategory::PhaseExecution,
        }
    }
}

/// Errors that abort a workflow run.
///
/// Every variant names the phase during which the run stopped.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The backend call itself failed (network, auth, rate limit, outage).
    #[error("{phase} backend call failed: {source}")]
    Backend {
        phase: PhaseId,
        #[source]
        source: LlmError,
    },

    /// Extraction or parsing did not produce a structured patch.
    #[error("{phase} produced malformed output: {reason}")]
    MalformedOutput { phase: PhaseId, reason: String },

    /// The phase's single suspension point exceeded its time bound.
    #[error("{phase} timed out after {duration:?}")]
    Timeout { phase: PhaseId, duration: Duration },

    /// The run's cancellation token fired.
    #[error("run cancelled during {phase}")]
    Cancelled { phase: PhaseId },

    /// The spawned backend task panicked or was aborted.
    #[error("{phase} backend task failed: {reason}")]
    TaskFailed { phase: PhaseId, reason: String },
}

impl WorkflowError {
    /// Phase during which the run stopped.
    #[must_use]
    pub fn phase(&self) -> PhaseId {
        match self {
            Self::Backend { phase, .. }
            | Self::MalformedOutput { phase, .. }
            | Self::Timeout { phase, .. }
            | Self::Cancelled { phase }
            | Self::TaskFailed { phase, .. } => *phase,
        }
    }

    /// One-line, provider-tagged, redacted message for the public event stream.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dealmemo_utils::error::{LlmError, WorkflowError};
    /// use dealmemo_utils::types::PhaseId;
    ///
    /// let err = WorkflowError::Backend {
    ///     phase: PhaseId::RiskAssessment,
    ///     source: LlmError::ProviderQuota("429 Too Many Requests".into()),
    /// };
    /// assert_eq!(
    ///     err.public_message("anthropic"),
    ///     "[anthropic] Risk Assessment failed: provider quota exceeded"
    /// );
    /// ```
    #[must_use]
    pub fn public_message(&self, provider: &str) -> String {
        let phase = self.phase().label();
        let summary = match self {
            Self::Backend { source, .. } => source.summary(),
            Self::MalformedOutput { .. } => {
                "response could not be parsed as structured data".to_string()
            }
            Self::Timeout { duration, .. } => format!("timed out after {}s", duration.as_secs()),
            Self::Cancelled { .. } => return format!("[{provider}] run cancelled during {phase}"),
            Self::TaskFailed { .. } => "backend task ended unexpectedly".to_string(),
        };
        redact_error_message(&format!("[{provider}] {phase} failed: {summary}"))
    }
}

impl UserFriendlyError for WorkflowError {
    fn user_message(&self) -> String {
        match self {
            Self::Backend { phase, source } => {
                format!("{} failed: {}", phase.label(), source.user_message())
            }
            Self::MalformedOutput { phase, reason } => {
                format!("{} returned output that is not a valid patch: {reason}", phase.label())
            }
            Self::Timeout { phase, duration } => {
                format!("{} timed out after {:?}", phase.label(), duration)
            }
            Self::Cancelled { phase } => format!("Run cancelled during {}", phase.label()),
            Self::TaskFailed { phase, reason } => {
                format!("{} backend task failed: {reason}", phase.label())
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Backend { source, .. } => source.context(),
            Self::MalformedOutput { .. } => Some(
                "Each phase must answer with a single JSON object; fenced JSON is accepted."
                    .to_string(),
            ),
            Self::Timeout { .. } => Some(
                "The time bound applies to the single backend call of each phase.".to_string(),
            ),
            Self::Cancelled { .. } | Self::TaskFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        let mut out = match self {
            Self::Backend { source, .. } => source.suggestions(),
            Self::MalformedOutput { .. } => vec![
                "Re-run; generation output varies between calls".to_string(),
                "Try a stronger model for this phase via [phases.<name>] model".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase --phase-timeout or the phase's phase_timeout".to_string(),
            ],
            Self::Cancelled { .. } | Self::TaskFailed { .. } => Vec::new(),
        };
        if !matches!(self, Self::Cancelled { .. }) {
            out.push(
                "Resume by passing the partial document back with --document".to_string(),
            );
        }
        out
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Backend { source, .. } => source.category(),
            Self::MalformedOutput { .. } | Self::Timeout { .. } | Self::TaskFailed { .. } => {
                ErrorCategory::PhaseExecution
            }
            Self::Cancelled { .. } => ErrorCategory::Cancellation,
        }
    }
}

impl UserFriendlyError for DealmemoError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Llm(e) => e.user_message(),
            Self::Workflow(e) => e.user_message(),
            Self::Io(e) => format!("File system error: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Llm(e) => e.context(),
            Self::Workflow(e) => e.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Llm(e) => e.suggestions(),
            Self::Workflow(e) => e.suggestions(),
            Self::Io(_) => vec!["Check that the path exists and is readable".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Llm(e) => e.category(),
            Self::Workflow(e) => e.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl DealmemoError {
    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// Format:
    /// ```text
    /// Error: <user_message>
    ///
    /// Context: <context>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    ///
    /// The whole rendering is passed through secret redaction.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        redact_error_message(&output)
    }

    /// Map this error to the appropriate CLI exit code.
    ///
    /// This is the single source of truth for exit codes.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dealmemo_utils::error::{DealmemoError, WorkflowError};
    /// use dealmemo_utils::exit_codes::ExitCode;
    /// use dealmemo_utils::types::PhaseId;
    ///
    /// let err = DealmemoError::Workflow(WorkflowError::MalformedOutput {
    ///     phase: PhaseId::DataCollection,
    ///     reason: "expected value at line 1 column 1".into(),
    /// });
    /// assert_eq!(err.to_exit_code(), ExitCode::MALFORMED_OUTPUT);
    /// ```
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        fn llm_code(err: &LlmError) -> ExitCode {
            match err {
                LlmError::Timeout { .. } => ExitCode::PHASE_TIMEOUT,
                LlmError::Misconfiguration(_) | LlmError::Unsupported(_) => ExitCode::CLI_ARGS,
                LlmError::InvalidRequest(_) => ExitCode::CLI_ARGS,
                LlmError::Transport(_)
                | LlmError::ProviderAuth(_)
                | LlmError::ProviderQuota(_)
                | LlmError::ProviderOutage(_) => ExitCode::BACKEND_FAILURE,
            }
        }

        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Llm(err) => llm_code(err),
            Self::Workflow(err) => match err {
                WorkflowError::Backend { source, .. } => llm_code(source),
                WorkflowError::MalformedOutput { .. } => ExitCode::MALFORMED_OUTPUT,
                WorkflowError::Timeout { .. } => ExitCode::PHASE_TIMEOUT,
                WorkflowError::Cancelled { .. } => ExitCode::CANCELLED,
                WorkflowError::TaskFailed { .. } => ExitCode::INTERNAL,
            },
            Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}

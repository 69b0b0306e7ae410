//! Foundation types and utilities shared by the dealmemo crates.

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod redaction;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use error::{
    ConfigError, DealmemoError, ErrorCategory, LlmError, UserFriendlyError, WorkflowError,
};
pub use exit_codes::ExitCode;
pub use types::{ConfigSource, PhaseId, ToolCapability};

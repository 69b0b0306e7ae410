//! Backend provider abstraction for dealmemo
//!
//! Every generation backend implements [`LlmBackend`]: one call, one network
//! round trip, typed response segments. The orchestrator selects options per
//! phase but never branches on which provider is active.
//!
//! ## Providers
//!
//! - **`gemini`** (default): Google Generative Language API
//! - **`anthropic`**: Anthropic Messages API

mod anthropic_backend;
mod attachments;
pub mod extractor;
mod gemini_backend;
pub(crate) mod http_client;
#[cfg(any(test, feature = "test-utils"))]
mod scripted;
mod types;

pub use attachments::{Attachment, AttachmentKind, EXCERPT_CHARS};
pub use dealmemo_utils::error::LlmError;
pub use extractor::{EMPTY_PAYLOAD, extract_payload};
pub use types::{
    ContentSegment, InvocationOptions, LlmBackend, LlmFallbackInfo, LlmInvocation, LlmResult,
};

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedBackend;

pub(crate) use anthropic_backend::AnthropicBackend;
pub(crate) use gemini_backend::GeminiBackend;

use dealmemo_config::Config;
use dealmemo_utils::redaction::redact_error_message;
use tracing::{info, warn};

/// Provider names accepted by the factory.
pub const SUPPORTED_PROVIDERS: [&str; 2] = ["gemini", "anthropic"];

/// Construct a backend for a specific provider.
///
/// Does not handle fallback; see [`from_config_with_fallback`].
///
/// # Errors
///
/// Returns `LlmError::Unsupported` if the provider is unknown.
/// Returns `LlmError::Misconfiguration` if provider-specific configuration is invalid.
pub fn construct_backend_for_provider(
    provider: &str,
    config: &Config,
) -> Result<Box<dyn LlmBackend>, LlmError> {
    match provider {
        "gemini" => Ok(Box::new(GeminiBackend::new_from_config(config)?)),
        "anthropic" => Ok(Box::new(AnthropicBackend::new_from_config(config)?)),
        unknown => Err(LlmError::Unsupported(format!(
            "Unknown LLM provider '{}'. Supported providers: {}.",
            unknown,
            SUPPORTED_PROVIDERS.join(", ")
        ))),
    }
}

/// Create a backend from configuration, returning fallback metadata when used.
///
/// If the primary provider fails to construct (missing API key, unknown
/// provider) and `llm.fallback_provider` is configured, the fallback is
/// constructed instead. Errors raised later by a constructed backend never
/// trigger fallback.
///
/// # Errors
///
/// Returns the primary provider's construction error when no fallback is
/// configured or the fallback also fails.
pub fn from_config_with_fallback(
    config: &Config,
) -> Result<(Box<dyn LlmBackend>, Option<LlmFallbackInfo>), LlmError> {
    let provider = config.provider();

    let primary_error = match construct_backend_for_provider(provider, config) {
        Ok(backend) => return Ok((backend, None)),
        Err(e) => e,
    };

    let Some(fallback_provider) = config.llm.fallback_provider.as_deref() else {
        return Err(primary_error);
    };

    let reason = redact_error_message(&primary_error.to_string());
    warn!(
        primary = provider,
        fallback = fallback_provider,
        reason = %reason,
        "Primary provider failed during construction; attempting fallback"
    );

    match construct_backend_for_provider(fallback_provider, config) {
        Ok(fallback_backend) => {
            info!(provider = fallback_provider, "Using fallback provider");
            Ok((
                fallback_backend,
                Some(LlmFallbackInfo {
                    primary_provider: provider.to_string(),
                    fallback_provider: fallback_provider.to_string(),
                    reason,
                }),
            ))
        }
        Err(fallback_error) => {
            warn!(
                provider = fallback_provider,
                error = %redact_error_message(&fallback_error.to_string()),
                "Fallback provider also failed"
            );
            // The primary error is the more relevant one.
            Err(primary_error)
        }
    }
}

/// Create a backend from configuration, discarding fallback metadata.
///
/// # Errors
///
/// See [`from_config_with_fallback`].
pub fn from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    let (backend, _fallback_info) = from_config_with_fallback(config)?;
    Ok(backend)
}

//! Core types for the backend provider abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use crate::attachments::Attachment;
use dealmemo_utils::error::LlmError;
use dealmemo_utils::types::{PhaseId, ToolCapability};

/// Per-call generation settings.
///
/// Backends map each option onto their own request format and drop what
/// they cannot express (with a debug log), so callers never branch on the
/// active provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationOptions {
    /// Extended reasoning before the final answer. Where supported it
    /// disables sampling temperature.
    pub reasoning_enabled: bool,
    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,
    /// Maximum output length for the call.
    pub token_budget: u32,
    /// Auxiliary tools attached to this call.
    pub tools: BTreeSet<ToolCapability>,
    /// Ask the provider for strict JSON output when it can.
    pub json_output: bool,
}

impl Default for InvocationOptions {
    fn default() -> Self {
        Self {
            reasoning_enabled: false,
            temperature: None,
            token_budget: 8192,
            tools: BTreeSet::new(),
            json_output: true,
        }
    }
}

/// Input to a single backend call
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Phase this call belongs to; `None` for the confirmation call
    pub phase_id: Option<PhaseId>,
    /// Model override; empty means the backend's configured model
    pub model: String,
    /// Upper bound for the HTTP round trip
    pub timeout: Duration,
    /// Role instructions (system prompt)
    pub instructions: String,
    /// User content
    pub content: String,
    /// Binary inputs, already base64-encoded
    pub attachments: Vec<Attachment>,
    pub options: InvocationOptions,
    /// Free-form tags carried into logs
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LlmInvocation {
    /// Create a new invocation with default options and no attachments
    #[must_use]
    pub fn new(
        phase_id: Option<PhaseId>,
        model: impl Into<String>,
        timeout: Duration,
        instructions: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            phase_id,
            model: model.into(),
            timeout,
            instructions: instructions.into(),
            content: content.into(),
            attachments: Vec::new(),
            options: InvocationOptions::default(),
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: InvocationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Add metadata to the invocation
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Reject requests that cannot produce structured output.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` when instructions or content are blank.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.instructions.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "role instructions must not be empty".to_string(),
            ));
        }
        if self.content.trim().is_empty() {
            return Err(LlmError::InvalidRequest(
                "user content must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Phase name for logs, `confirmation` when the call is not phase-owned.
    #[must_use]
    pub fn phase_name(&self) -> &'static str {
        self.phase_id.map_or("confirmation", |p| p.as_str())
    }
}

/// One typed piece of a backend response, in response order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentSegment {
    /// Plain answer text.
    Text { text: String },
    /// Reasoning trace emitted before the answer.
    Reasoning { text: String },
    /// A tool call issued by the model.
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
    /// Output returned by a server-side tool.
    ToolResult {
        name: String,
        output: serde_json::Value,
    },
}

impl ContentSegment {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning { text: text.into() }
    }
}

/// Result from a backend call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Response segments in the order the provider returned them
    pub segments: Vec<ContentSegment>,
    /// Provider name (e.g., "gemini", "anthropic")
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    /// Input tokens consumed (if available)
    pub tokens_input: Option<u64>,
    /// Output tokens generated (if available)
    pub tokens_output: Option<u64>,
    /// Timeout that bounded the call, in seconds
    pub timeout_seconds: Option<u64>,
    /// Provider-specific extensions (finish reason, block reason)
    pub extensions: HashMap<String, serde_json::Value>,
}

impl LlmResult {
    /// Create a new result
    #[must_use]
    pub fn new(
        segments: Vec<ContentSegment>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            segments,
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
            timeout_seconds: None,
            extensions: HashMap::new(),
        }
    }

    /// Result holding a single text segment
    #[must_use]
    pub fn from_text(
        text: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self::new(vec![ContentSegment::text(text)], provider, model_used)
    }

    /// Set token counts
    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }

    /// Set timeout duration in seconds
    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Add an extension field
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }
}

/// Trait for backend implementations
///
/// Every provider implements this trait so the orchestrator can drive any
/// of them without knowing implementation details. One call is exactly one
/// network round trip; retry policy belongs to the caller.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Stable provider name used in logs and public error messages.
    fn provider(&self) -> &'static str;

    /// Invoke the backend with the given invocation parameters
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for any failure during invocation, including:
    /// - Invalid requests rejected before any network I/O
    /// - Transport failures and undecodable responses
    /// - Provider errors (auth, quota, outages)
    /// - Timeouts
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}

/// Recorded when the primary provider could not be constructed and the
/// configured fallback provider was used instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmFallbackInfo {
    pub primary_provider: String,
    pub fallback_provider: String,
    /// Redacted construction error of the primary provider
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(instructions: &str, content: &str) -> LlmInvocation {
        LlmInvocation::new(
            Some(PhaseId::DataCollection),
            "",
            Duration::from_secs(30),
            instructions,
            content,
        )
    }

    #[test]
    fn test_validate_rejects_blank_inputs() {
        assert!(invocation("You are an analyst.", "Analyze Acme").validate().is_ok());

        match invocation("  \n", "Analyze Acme").validate() {
            Err(LlmError::InvalidRequest(msg)) => assert!(msg.contains("instructions")),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
        match invocation("You are an analyst.", "").validate() {
            Err(LlmError::InvalidRequest(msg)) => assert!(msg.contains("content")),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_phase_name_for_confirmation() {
        let mut inv = invocation("a", "b");
        assert_eq!(inv.phase_name(), "data_collection");
        inv.phase_id = None;
        assert_eq!(inv.phase_name(), "confirmation");
    }

    #[test]
    fn test_segment_serialization_is_tagged() {
        let json = serde_json::to_value(ContentSegment::reasoning("thinking")).unwrap();
        assert_eq!(json["type"], "reasoning");
        assert_eq!(json["text"], "thinking");
    }

    #[test]
    fn test_result_builders() {
        let result = LlmResult::from_text("{}", "gemini", "gemini-2.5-pro")
            .with_tokens(10, 20)
            .with_timeout_seconds(600)
            .with_extension("finish_reason", serde_json::json!("STOP"));
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.tokens_input, Some(10));
        assert_eq!(result.tokens_output, Some(20));
        assert_eq!(result.timeout_seconds, Some(600));
        assert_eq!(result.extensions["finish_reason"], "STOP");
    }
}

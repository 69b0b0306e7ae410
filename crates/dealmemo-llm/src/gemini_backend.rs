//! Gemini HTTP backend implementation
//!
//! Talks to the Google Generative Language `generateContent` REST API.
//! Supports grounded search and code execution tools and strict JSON
//! response formatting. Extended reasoning is not negotiated here.

use crate::attachments::AttachmentKind;
use crate::http_client::{HttpClient, decode_json};
use crate::types::{ContentSegment, LlmBackend, LlmInvocation, LlmResult};
use async_trait::async_trait;
use dealmemo_config::Config;
use dealmemo_utils::error::LlmError;
use dealmemo_utils::types::ToolCapability;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Default Gemini API endpoint (model path is appended)
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Model used when neither the invocation nor `[llm.gemini]` names one
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Environment variable holding the API key unless `api_key_env` overrides it
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

const PROVIDER: &str = "gemini";

#[derive(Clone)]
pub(crate) struct GeminiBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        default_model: String,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::shared()?,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            default_model,
        })
    }

    /// Create a new Gemini backend from configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if:
    /// - The API key environment variable is not set
    /// - The HTTP client cannot be constructed
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let section = config.llm.gemini.as_ref();
        let api_key_env = section
            .and_then(|g| g.api_key_env.as_deref())
            .unwrap_or(DEFAULT_API_KEY_ENV);

        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Misconfiguration(format!(
                    "Gemini API key not found in environment variable '{}'. \
                     Please set this variable or configure a different api_key_env in [llm.gemini].",
                    api_key_env
                ))
            })?;

        let base_url = section.and_then(|g| g.base_url.clone());
        let default_model = section
            .and_then(|g| g.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self::new(api_key, base_url, default_model)
    }

    fn resolve_model(&self, inv: &LlmInvocation) -> String {
        if inv.model.trim().is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        }
    }
}

/// Translate an invocation into a `generateContent` request body.
pub(crate) fn build_request(inv: &LlmInvocation) -> GeminiRequest {
    let mut parts = Vec::with_capacity(inv.attachments.len() + 1);
    for attachment in &inv.attachments {
        match attachment.kind() {
            AttachmentKind::Pdf | AttachmentKind::Image => parts.push(GeminiPart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: attachment.mime_type.clone(),
                    data: attachment.data.clone(),
                }),
            }),
            AttachmentKind::Other => parts.push(GeminiPart::text(attachment.text_reference())),
        }
    }
    parts.push(GeminiPart::text(inv.content.clone()));

    let mut tools = Vec::new();
    for tool in &inv.options.tools {
        match tool {
            ToolCapability::WebSearch => tools.push(GeminiTool {
                google_search: Some(Empty {}),
                code_execution: None,
            }),
            ToolCapability::CodeExecution => tools.push(GeminiTool {
                google_search: None,
                code_execution: Some(Empty {}),
            }),
            unsupported => {
                debug!(provider = PROVIDER, tool = %unsupported, "Dropping unsupported tool");
            }
        }
    }

    if inv.options.reasoning_enabled {
        debug!(
            provider = PROVIDER,
            "Extended reasoning not negotiated for this provider; ignoring"
        );
    }

    let response_mime_type = if inv.options.json_output && tools.is_empty() {
        Some("application/json".to_string())
    } else {
        if inv.options.json_output {
            debug!(
                provider = PROVIDER,
                "JSON response mode dropped because tools are attached"
            );
        }
        None
    };

    GeminiRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(inv.instructions.clone())],
        },
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: inv.options.temperature,
            max_output_tokens: inv.options.token_budget,
            response_mime_type,
        },
        tools,
    }
}

/// Convert a `generateContent` response into typed segments.
pub(crate) fn parse_response(response: GeminiResponse, model: String) -> LlmResult {
    let mut segments = Vec::new();
    let mut finish_reason = None;

    if let Some(candidate) = response.candidates.into_iter().next() {
        finish_reason = candidate.finish_reason;
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(code) = part.executable_code {
                segments.push(ContentSegment::ToolUse {
                    name: "code_execution".to_string(),
                    input: serde_json::json!({ "language": code.language, "code": code.code }),
                });
            } else if let Some(result) = part.code_execution_result {
                segments.push(ContentSegment::ToolResult {
                    name: "code_execution".to_string(),
                    output: serde_json::json!({ "outcome": result.outcome, "output": result.output }),
                });
            } else if let Some(text) = part.text {
                if part.thought {
                    segments.push(ContentSegment::Reasoning { text });
                } else {
                    segments.push(ContentSegment::Text { text });
                }
            }
        }
    }

    let mut result = LlmResult::new(segments, PROVIDER, response.model_version.unwrap_or(model));
    if let Some(usage) = response.usage_metadata {
        result.tokens_input = usage.prompt_token_count;
        result.tokens_output = usage.candidates_token_count;
    }
    if let Some(reason) = finish_reason {
        result = result.with_extension("finish_reason", serde_json::Value::String(reason));
    }
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        result = result.with_extension("block_reason", serde_json::Value::String(reason));
    }
    result
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        inv.validate()?;
        let model = self.resolve_model(&inv);

        debug!(
            provider = PROVIDER,
            model = %model,
            phase = inv.phase_name(),
            max_tokens = inv.options.token_budget,
            attachments = inv.attachments.len(),
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Gemini backend"
        );

        let body = build_request(&inv);
        let url = format!("{}/{}:generateContent", self.base_url, model);
        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body);

        let response = self.client.execute(request, inv.timeout, PROVIDER).await?;
        let response_body: GeminiResponse = decode_json(response, PROVIDER).await?;

        let result = parse_response(response_body, model).with_timeout_seconds(inv.timeout.as_secs());

        debug!(
            provider = PROVIDER,
            segments = result.segments.len(),
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Gemini invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<Empty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_execution: Option<Empty>,
}

#[derive(Debug, Clone, Serialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    #[serde(default)]
    executable_code: Option<ExecutableCode>,
    #[serde(default)]
    code_execution_result: Option<CodeExecutionResult>,
}

#[derive(Debug, Deserialize)]
struct ExecutableCode {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct CodeExecutionResult {
    #[serde(default)]
    outcome: Option<String>,
    #[serde(default)]
    output: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u64>,
    #[serde(default)]
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

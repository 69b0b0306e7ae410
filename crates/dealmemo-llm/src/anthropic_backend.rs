//! Anthropic HTTP backend implementation
//!
//! HTTP backend for Anthropic's Messages API. Negotiates extended thinking
//! (which replaces sampling temperature), server-side web search and code
//! execution tools, and document/spreadsheet skills attached per call.

use crate::attachments::AttachmentKind;
use crate::http_client::{HttpClient, decode_json};
use crate::types::{ContentSegment, LlmBackend, LlmInvocation, LlmResult};
use async_trait::async_trait;
use dealmemo_config::Config;
use dealmemo_utils::error::LlmError;
use dealmemo_utils::types::ToolCapability;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

/// Default Anthropic API endpoint
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model used when neither the invocation nor `[llm.anthropic]` names one
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Environment variable holding the API key unless `api_key_env` overrides it
pub const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Output tokens reserved for the answer on top of the thinking budget
const ANSWER_HEADROOM_TOKENS: u32 = 4096;

/// Smallest thinking budget the API accepts
const MIN_THINKING_BUDGET: u32 = 1024;

const CODE_EXECUTION_BETA: &str = "code-execution-2025-08-25";
const SKILLS_BETA: &str = "skills-2025-10-02";

const PROVIDER: &str = "anthropic";

/// Anthropic backend configuration
#[derive(Clone)]
pub(crate) struct AnthropicBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend
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
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
        })
    }

    /// Create a new Anthropic backend from configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if:
    /// - The API key environment variable is not set
    /// - The HTTP client cannot be constructed
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let section = config.llm.anthropic.as_ref();
        let api_key_env = section
            .and_then(|a| a.api_key_env.as_deref())
            .unwrap_or(DEFAULT_API_KEY_ENV);

        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Misconfiguration(format!(
                    "Anthropic API key not found in environment variable '{}'. \
                     Please set this variable or configure a different api_key_env in [llm.anthropic].",
                    api_key_env
                ))
            })?;

        let base_url = section.and_then(|a| a.base_url.clone());
        let default_model = section
            .and_then(|a| a.model.clone())
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

/// A prepared Messages API request: body plus the beta features it needs.
#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub body: AnthropicRequest,
    pub betas: Vec<&'static str>,
}

/// Translate an invocation into a Messages API request.
pub(crate) fn build_request(inv: &LlmInvocation, model: &str) -> PreparedRequest {
    let opts = &inv.options;

    let mut content = Vec::with_capacity(inv.attachments.len() + 1);
    for attachment in &inv.attachments {
        let source = Base64Source {
            source_type: "base64",
            media_type: attachment.mime_type.clone(),
            data: attachment.data.clone(),
        };
        content.push(match attachment.kind() {
            AttachmentKind::Pdf => ContentBlock::Document { source },
            AttachmentKind::Image => ContentBlock::Image { source },
            AttachmentKind::Other => ContentBlock::Text {
                text: attachment.text_reference(),
            },
        });
    }
    content.push(ContentBlock::Text {
        text: inv.content.clone(),
    });

    let (thinking, temperature, max_tokens) = if opts.reasoning_enabled {
        let budget = opts.token_budget.max(MIN_THINKING_BUDGET);
        (
            Some(Thinking {
                thinking_type: "enabled",
                budget_tokens: budget,
            }),
            None,
            budget.saturating_add(ANSWER_HEADROOM_TOKENS),
        )
    } else {
        (None, opts.temperature, opts.token_budget)
    };

    let mut skills = Vec::new();
    let mut tools = Vec::new();
    let mut code_execution = false;
    for tool in &opts.tools {
        match tool {
            ToolCapability::WebSearch => tools.push(json!({
                "type": "web_search_20250305",
                "name": "web_search",
                "max_uses": 5
            })),
            ToolCapability::CodeExecution => code_execution = true,
            ToolCapability::Spreadsheets => skills.push(Skill::anthropic("xlsx")),
            ToolCapability::Documents => {
                skills.push(Skill::anthropic("pdf"));
                skills.push(Skill::anthropic("docx"));
            }
        }
    }

    let mut betas = Vec::new();
    if code_execution || !skills.is_empty() {
        tools.push(json!({
            "type": "code_execution_20250825",
            "name": "code_execution"
        }));
        betas.push(CODE_EXECUTION_BETA);
    }
    let container = if skills.is_empty() {
        None
    } else {
        betas.push(SKILLS_BETA);
        Some(Container { skills })
    };

    PreparedRequest {
        body: AnthropicRequest {
            model: model.to_string(),
            max_tokens,
            system: inv.instructions.clone(),
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
            temperature,
            thinking,
            tools,
            container,
        },
        betas,
    }
}

/// Convert a Messages API response into typed segments.
pub(crate) fn parse_response(response: AnthropicResponse, model: String) -> LlmResult {
    let segments = response
        .content
        .iter()
        .filter_map(segment_from_block)
        .collect();

    let mut result = LlmResult::new(segments, PROVIDER, response.model.unwrap_or(model));
    if let Some(usage) = response.usage {
        result = result.with_tokens(usage.input_tokens, usage.output_tokens);
    }
    if let Some(reason) = response.stop_reason {
        result = result.with_extension("stop_reason", Value::String(reason));
    }
    result
}

fn segment_from_block(block: &Value) -> Option<ContentSegment> {
    let block_type = block.get("type")?.as_str()?;
    let str_field = |key: &str| block.get(key).and_then(Value::as_str).map(str::to_string);

    match block_type {
        "text" => str_field("text").map(|text| ContentSegment::Text { text }),
        "thinking" => str_field("thinking").map(|text| ContentSegment::Reasoning { text }),
        "tool_use" | "server_tool_use" => Some(ContentSegment::ToolUse {
            name: str_field("name").unwrap_or_default(),
            input: block.get("input").cloned().unwrap_or(Value::Null),
        }),
        t if t.ends_with("_tool_result") => Some(ContentSegment::ToolResult {
            name: t.trim_end_matches("_tool_result").to_string(),
            output: block.get("content").cloned().unwrap_or(Value::Null),
        }),
        other => {
            debug!(provider = PROVIDER, block_type = other, "Skipping content block");
            None
        }
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        inv.validate()?;
        let model = self.resolve_model(&inv);
        let prepared = build_request(&inv, &model);

        debug!(
            provider = PROVIDER,
            model = %model,
            phase = inv.phase_name(),
            max_tokens = prepared.body.max_tokens,
            thinking = inv.options.reasoning_enabled,
            attachments = inv.attachments.len(),
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Anthropic backend"
        );

        let mut request = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        if !prepared.betas.is_empty() {
            request = request.header("anthropic-beta", prepared.betas.join(","));
        }
        let request = request.json(&prepared.body);

        let response = self.client.execute(request, inv.timeout, PROVIDER).await?;
        let response_body: AnthropicResponse = decode_json(response, PROVIDER).await?;

        let result = parse_response(response_body, model).with_timeout_seconds(inv.timeout.as_secs());

        debug!(
            provider = PROVIDER,
            segments = result.segments.len(),
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Anthropic invocation completed"
        );

        Ok(result)
    }
}

/// Anthropic request body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<Thinking>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<Container>,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: Base64Source },
    Document { source: Base64Source },
}

#[derive(Debug, Clone, Serialize)]
struct Base64Source {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
struct Thinking {
    #[serde(rename = "type")]
    thinking_type: &'static str,
    budget_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Container {
    skills: Vec<Skill>,
}

#[derive(Debug, Clone, Serialize)]
struct Skill {
    #[serde(rename = "type")]
    skill_type: &'static str,
    skill_id: &'static str,
    version: &'static str,
}

impl Skill {
    fn anthropic(skill_id: &'static str) -> Self {
        Self {
            skill_type: "anthropic",
            skill_id,
            version: "latest",
        }
    }
}

/// Anthropic response body
#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicResponse {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

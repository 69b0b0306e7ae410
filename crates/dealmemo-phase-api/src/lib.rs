//! Phase trait system for memorandum generation workflows
//!
//! This crate provides the shared contract between the orchestrator and the
//! phase implementations: what a phase reads ([`PhaseContext`]), how it
//! configures its backend call ([`InvocationProfile`]), and how it turns raw
//! output into a [`DocumentPatch`] restricted to the fields it owns.

use std::borrow::Cow;
use std::collections::BTreeSet;

use dealmemo_config::PhaseProfileConfig;
use dealmemo_document::{Document, DocumentPatch, PatchField};
use dealmemo_llm::{Attachment, InvocationOptions};
use dealmemo_utils::error::{ConfigError, WorkflowError};
use dealmemo_utils::types::ToolCapability;
use tracing::debug;

pub use dealmemo_utils::types::PhaseId;

/// Source of the schema-describing instruction string for each phase.
///
/// The orchestrator's only contract with a prompt/schema library is
/// "one instruction string per phase".
pub trait SchemaLibrary: Send + Sync {
    fn schema(&self, phase: PhaseId) -> Cow<'_, str>;
}

/// Read-only inputs for one phase.
#[derive(Clone, Copy)]
pub struct PhaseContext<'a> {
    /// The original free-text request
    pub request: &'a str,
    /// Document as merged through the previous phase
    pub document: &'a Document,
    /// Attachments supplied with the run
    pub attachments: &'a [Attachment],
    pub schemas: &'a dyn SchemaLibrary,
}

impl std::fmt::Debug for PhaseContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseContext")
            .field("request", &self.request)
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

/// Backend settings for one phase's call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationProfile {
    pub reasoning: bool,
    pub temperature: Option<f32>,
    pub token_budget: u32,
    pub tools: BTreeSet<ToolCapability>,
    pub json_output: bool,
}

impl InvocationProfile {
    /// Apply a `[phases.<phase>]` override section on top of this profile.
    ///
    /// Turning reasoning on clears the temperature unless the section sets
    /// one explicitly.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unknown tool names.
    pub fn with_overrides(
        mut self,
        overrides: Option<&PhaseProfileConfig>,
    ) -> Result<Self, ConfigError> {
        let Some(cfg) = overrides else {
            return Ok(self);
        };
        if let Some(reasoning) = cfg.reasoning {
            if reasoning && !self.reasoning && cfg.temperature.is_none() {
                self.temperature = None;
            }
            self.reasoning = reasoning;
        }
        if let Some(temperature) = cfg.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(budget) = cfg.token_budget {
            self.token_budget = budget;
        }
        if let Some(tools) = cfg.tool_set()? {
            self.tools = tools;
        }
        Ok(self)
    }

    /// Backend options for this profile.
    #[must_use]
    pub fn to_options(&self) -> InvocationOptions {
        InvocationOptions {
            reasoning_enabled: self.reasoning,
            temperature: self.temperature,
            token_budget: self.token_budget,
            tools: self.tools.clone(),
            json_output: self.json_output,
        }
    }
}

/// Core trait that all memorandum phases implement
///
/// A phase is pure with respect to the document: it reads a snapshot through
/// [`PhaseContext`] and returns a patch. The merge step is the only mutator.
pub trait Phase: Send + Sync {
    /// Returns the unique identifier for this phase
    fn id(&self) -> PhaseId;

    /// Fields this phase exclusively writes.
    fn owned_fields(&self) -> &'static [PatchField];

    /// Fields owned elsewhere that this phase may refine with non-empty values.
    fn refinable_fields(&self) -> &'static [PatchField] {
        &[]
    }

    /// Built-in backend settings, before config overrides.
    fn profile(&self) -> InvocationProfile;

    /// Role instructions, including the phase's output schema.
    fn instructions(&self, ctx: &PhaseContext<'_>) -> String;

    /// User content: the request plus the already-merged fields this phase builds on.
    fn prompt(&self, ctx: &PhaseContext<'_>) -> String;

    /// Attachments forwarded to the backend. Only the first phase sends any.
    fn attachments(&self, _ctx: &PhaseContext<'_>) -> Vec<Attachment> {
        Vec::new()
    }

    /// Parse extracted output into a patch limited to this phase's fields.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::MalformedOutput` if the payload is not a JSON object.
    fn postprocess(
        &self,
        raw: &str,
        _ctx: &PhaseContext<'_>,
    ) -> Result<DocumentPatch, WorkflowError> {
        parse_patch(self.id(), raw, &self.writable_fields())
    }

    /// Owned plus refinable fields.
    fn writable_fields(&self) -> Vec<PatchField> {
        self.owned_fields()
            .iter()
            .chain(self.refinable_fields())
            .copied()
            .collect()
    }
}

/// Parse a phase payload into a patch holding only `allowed` fields.
///
/// Missing keys are not errors: they stay absent so the merge keeps the
/// previous value. Keys outside `allowed` are dropped with a debug log.
///
/// # Errors
///
/// Returns `WorkflowError::MalformedOutput` when `raw` is not valid JSON or
/// is valid JSON but not an object.
pub fn parse_patch(
    phase: PhaseId,
    raw: &str,
    allowed: &[PatchField],
) -> Result<DocumentPatch, WorkflowError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| WorkflowError::MalformedOutput {
            phase,
            reason: format!(
                "invalid JSON at line {} column {}",
                e.line(),
                e.column()
            ),
        })?;

    if !value.is_object() {
        return Err(WorkflowError::MalformedOutput {
            phase,
            reason: format!("expected a JSON object, found {}", json_kind(&value)),
        });
    }

    let mut patch: DocumentPatch =
        serde_json::from_value(value).map_err(|e| WorkflowError::MalformedOutput {
            phase,
            reason: format!("object does not match the document shape: {e}"),
        })?;

    let dropped = patch.retain_fields(allowed);
    if !dropped.is_empty() {
        debug!(
            phase = phase.as_str(),
            dropped = ?dropped.iter().map(PatchField::as_str).collect::<Vec<_>>(),
            "Dropped fields owned by other phases"
        );
    }
    Ok(patch)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> InvocationProfile {
        InvocationProfile {
            reasoning: false,
            temperature: Some(0.3),
            token_budget: 8192,
            tools: BTreeSet::new(),
            json_output: true,
        }
    }

    #[test]
    fn test_parse_patch_rejects_non_json() {
        match parse_patch(PhaseId::DataCollection, "not json", &[PatchField::Title]) {
            Err(WorkflowError::MalformedOutput { phase, reason }) => {
                assert_eq!(phase, PhaseId::DataCollection);
                assert!(reason.contains("invalid JSON"));
            }
            other => panic!("expected MalformedOutput, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_patch_rejects_non_objects() {
        for raw in ["[]", "42", "\"text\"", "null"] {
            let err = parse_patch(PhaseId::Writing, raw, &[]).unwrap_err();
            assert!(
                matches!(&err, WorkflowError::MalformedOutput { reason, .. } if reason.contains("expected a JSON object")),
                "{raw}: {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_patch_keeps_only_allowed_fields() {
        let raw = r#"{"title":"Acme Credit Memo","risks":[{"category":"Leverage"}],"companyOverview":"Widgets"}"#;
        let patch = parse_patch(
            PhaseId::DataCollection,
            raw,
            &[PatchField::Title, PatchField::CompanyOverview],
        )
        .unwrap();
        assert_eq!(patch.title.as_deref(), Some("Acme Credit Memo"));
        assert_eq!(patch.company_overview.as_deref(), Some("Widgets"));
        assert!(patch.risks.is_none());
    }

    #[test]
    fn test_empty_object_is_empty_patch() {
        let patch = parse_patch(PhaseId::RiskAssessment, "{}", &[PatchField::Risks]).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_overrides_apply_field_by_field() {
        let cfg = PhaseProfileConfig {
            token_budget: Some(4096),
            tools: Some(vec!["web_search".into()]),
            ..Default::default()
        };
        let p = profile().with_overrides(Some(&cfg)).unwrap();
        assert_eq!(p.token_budget, 4096);
        assert_eq!(p.temperature, Some(0.3));
        assert_eq!(p.tools, BTreeSet::from([ToolCapability::WebSearch]));
        assert_eq!(profile().with_overrides(None).unwrap(), profile());
    }

    #[test]
    fn test_enabling_reasoning_clears_default_temperature() {
        let cfg = PhaseProfileConfig {
            reasoning: Some(true),
            ..Default::default()
        };
        let p = profile().with_overrides(Some(&cfg)).unwrap();
        assert!(p.reasoning);
        assert_eq!(p.temperature, None);

        let options = p.to_options();
        assert!(options.reasoning_enabled);
        assert!(options.json_output);
    }

    #[test]
    fn test_unknown_tool_is_config_error() {
        let cfg = PhaseProfileConfig {
            tools: Some(vec!["browser".into()]),
            ..Default::default()
        };
        assert!(matches!(
            profile().with_overrides(Some(&cfg)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}

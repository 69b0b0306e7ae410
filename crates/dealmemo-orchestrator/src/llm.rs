//! Invocation construction for phases and the confirmation call.

use dealmemo_document::Document;
use dealmemo_llm::LlmInvocation;
use dealmemo_phase_api::{Phase, PhaseContext};
use dealmemo_phases::{CONFIRMATION_INSTRUCTIONS, confirmation_prompt};

use crate::config::CallSettings;

/// Build the backend call for one phase from a document snapshot.
pub(crate) fn build_phase_invocation(
    run_id: &str,
    phase: &dyn Phase,
    ctx: &PhaseContext<'_>,
    settings: &CallSettings,
) -> LlmInvocation {
    LlmInvocation::new(
        Some(phase.id()),
        settings.model.clone(),
        settings.timeout.duration,
        phase.instructions(ctx),
        phase.prompt(ctx),
    )
    .with_options(settings.profile.to_options())
    .with_attachments(phase.attachments(ctx))
    .with_metadata("run_id", serde_json::Value::from(run_id))
}

pub(crate) fn build_confirmation_invocation(
    request: &str,
    document: &Document,
    settings: &CallSettings,
) -> LlmInvocation {
    LlmInvocation::new(
        None,
        settings.model.clone(),
        settings.timeout.duration,
        CONFIRMATION_INSTRUCTIONS,
        confirmation_prompt(request, document),
    )
    .with_options(settings.profile.to_options())
}

//! Single-phase execution with timeout and cancellation handling.
//!
//! A phase has exactly one suspension point: its backend call. The call is
//! spawned as its own task and raced against the run's cancellation token
//! and the phase's time bound. Losing the race drops the join handle, which
//! detaches the call; it runs to completion and its result is discarded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dealmemo_document::DocumentPatch;
use dealmemo_llm::{LlmBackend, LlmError, LlmInvocation, LlmResult, extract_payload};
use dealmemo_phase_api::{Phase, PhaseContext, PhaseId};
use dealmemo_utils::error::WorkflowError;
use dealmemo_utils::logging::{log_phase_complete, log_phase_error, log_phase_start};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CallSettings;
use crate::llm::build_phase_invocation;

/// Why a bounded call produced no result.
#[derive(Debug)]
pub(crate) enum CallError {
    Backend(LlmError),
    TimedOut(Duration),
    Cancelled,
    Task(String),
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(error) => write!(f, "{error}"),
            Self::TimedOut(duration) => write!(f, "timed out after {}s", duration.as_secs()),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Task(reason) => write!(f, "backend task failed: {reason}"),
        }
    }
}

impl CallError {
    pub(crate) fn into_workflow_error(self, phase: PhaseId) -> WorkflowError {
        match self {
            Self::Backend(source) => WorkflowError::Backend { phase, source },
            Self::TimedOut(duration) => WorkflowError::Timeout { phase, duration },
            Self::Cancelled => WorkflowError::Cancelled { phase },
            Self::Task(reason) => WorkflowError::TaskFailed { phase, reason },
        }
    }
}

/// Issue one backend call bounded by `bound` and `cancel`.
///
/// Cancellation is checked first on every poll, so a token that fires at
/// the same time as the call completes still wins.
pub(crate) async fn bounded_call(
    backend: Arc<dyn LlmBackend>,
    invocation: LlmInvocation,
    bound: Duration,
    cancel: &CancellationToken,
) -> Result<LlmResult, CallError> {
    if cancel.is_cancelled() {
        return Err(CallError::Cancelled);
    }

    let call = tokio::spawn(async move { backend.invoke(invocation).await });

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CallError::Cancelled),
        joined = tokio::time::timeout(bound, call) => match joined {
            Err(_) => Err(CallError::TimedOut(bound)),
            Ok(Err(join_error)) => Err(CallError::Task(join_error.to_string())),
            Ok(Ok(Err(LlmError::Timeout { duration }))) => Err(CallError::TimedOut(duration)),
            Ok(Ok(Err(error))) => Err(CallError::Backend(error)),
            Ok(Ok(Ok(result))) => Ok(result),
        },
    }
}

/// What a successful phase hands back to the workflow loop.
#[derive(Debug)]
pub(crate) struct PhaseExecution {
    pub patch: DocumentPatch,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

/// Run one phase against a document snapshot: build, call, extract, parse.
///
/// The caller merges the returned patch; this function never mutates the
/// document.
pub(crate) async fn execute_phase(
    backend: &Arc<dyn LlmBackend>,
    phase: &dyn Phase,
    ctx: &PhaseContext<'_>,
    settings: &CallSettings,
    run_id: &str,
    cancel: &CancellationToken,
) -> Result<PhaseExecution, WorkflowError> {
    let phase_id = phase.id();
    let started = Instant::now();
    let invocation = build_phase_invocation(run_id, phase, ctx, settings);
    log_phase_start(phase_id.as_str(), display_model(&settings.model));

    let outcome = bounded_call(
        Arc::clone(backend),
        invocation,
        settings.timeout.duration,
        cancel,
    )
    .await
    .map_err(|e| e.into_workflow_error(phase_id))
    .and_then(|result| {
        let raw = extract_payload(&result);
        debug!(phase = %phase_id, bytes = raw.len(), "Extracted phase payload");
        let patch = phase.postprocess(&raw, ctx)?;
        Ok(PhaseExecution {
            patch,
            model_used: result.model_used,
            tokens_input: result.tokens_input,
            tokens_output: result.tokens_output,
        })
    });

    let duration_ms = started.elapsed().as_millis();
    match &outcome {
        Ok(execution) => log_phase_complete(
            phase_id.as_str(),
            duration_ms,
            execution.tokens_input,
            execution.tokens_output,
        ),
        Err(error) => log_phase_error(phase_id.as_str(), &error.to_string(), duration_ms),
    }
    outcome
}

fn display_model(model: &str) -> &str {
    if model.is_empty() { "provider default" } else { model }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use dealmemo_document::Document;
    use dealmemo_llm::ScriptedBackend;
    use dealmemo_phases::{BuiltinSchemas, phase_for};

    fn invocation() -> LlmInvocation {
        LlmInvocation::new(
            Some(PhaseId::Writing),
            "",
            Duration::from_secs(5),
            "Write the memo",
            "Analyze Acme Corp",
        )
    }

    #[tokio::test]
    async fn test_bounded_call_returns_result() {
        let backend = ScriptedBackend::new();
        backend.push_text("{}");
        let result = bounded_call(
            Arc::new(backend),
            invocation(),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(extract_payload(&result), "{}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_call_times_out() {
        let backend = ScriptedBackend::new().with_delay(Duration::from_secs(60));
        backend.push_text("{}");
        let err = bounded_call(
            Arc::new(backend),
            invocation(),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CallError::TimedOut(d) if d == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_the_call() {
        let backend = ScriptedBackend::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = bounded_call(
            Arc::new(backend.clone()),
            invocation(),
            Duration::from_secs(5),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CallError::Cancelled));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_timeout_maps_to_phase_timeout() {
        let backend = ScriptedBackend::new();
        backend.push_error(LlmError::Timeout {
            duration: Duration::from_secs(30),
        });
        let err = bounded_call(
            Arc::new(backend),
            invocation(),
            Duration::from_secs(60),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err()
        .into_workflow_error(PhaseId::Writing);
        assert!(matches!(err, WorkflowError::Timeout { phase: PhaseId::Writing, .. }));
    }

    #[tokio::test]
    async fn test_execute_phase_keeps_only_owned_fields() {
        let backend = ScriptedBackend::new();
        backend.push_text(
            "```json\n{\"companyOverview\":\"X\",\"risks\":[{\"category\":\"Leverage\"}]}\n```",
        );
        let backend: Arc<dyn LlmBackend> = Arc::new(backend);
        let cfg = OrchestratorConfig::default();
        let doc = Document::new();
        let ctx = PhaseContext {
            request: "Analyze Acme Corp",
            document: &doc,
            attachments: &[],
            schemas: &BuiltinSchemas,
        };
        let phase = phase_for(PhaseId::DataCollection);

        let execution = execute_phase(
            &backend,
            phase.as_ref(),
            &ctx,
            cfg.phase(PhaseId::DataCollection),
            "run-1",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(execution.patch.company_overview.as_deref(), Some("X"));
        assert!(execution.patch.risks.is_none());
        assert_eq!(execution.model_used, "scripted-model");
    }

    #[tokio::test]
    async fn test_execute_phase_rejects_prose() {
        let backend = ScriptedBackend::new();
        backend.push_text("not json");
        let backend: Arc<dyn LlmBackend> = Arc::new(backend);
        let cfg = OrchestratorConfig::default();
        let doc = Document::new();
        let ctx = PhaseContext {
            request: "Analyze Acme Corp",
            document: &doc,
            attachments: &[],
            schemas: &BuiltinSchemas,
        };
        let phase = phase_for(PhaseId::RiskAssessment);

        let err = execute_phase(
            &backend,
            phase.as_ref(),
            &ctx,
            cfg.phase(PhaseId::RiskAssessment),
            "run-1",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MalformedOutput { phase: PhaseId::RiskAssessment, .. }
        ));
    }
}

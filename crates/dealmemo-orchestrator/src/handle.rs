//! Orchestrator façade for external consumers.
//!
//! **Integration rule**: outside this crate, use `OrchestratorHandle`. The
//! workflow loop and phase execution are internals.

use std::fmt;
use std::sync::{Arc, Mutex};

use dealmemo_config::Config;
use dealmemo_document::Document;
use dealmemo_llm::{EMPTY_PAYLOAD, LlmBackend, LlmFallbackInfo, extract_payload};
use dealmemo_phase_api::{Phase, PhaseId, SchemaLibrary};
use dealmemo_phases::{BuiltinSchemas, FALLBACK_CONFIRMATION, default_pipeline};
use dealmemo_utils::error::{DealmemoError, WorkflowError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::events::WorkflowEvent;
use crate::llm::build_confirmation_invocation;
use crate::phase_exec::bounded_call;
use crate::workflow::{
    Checkpoint, SharedCheckpoint, Workflow, WorkflowFailure, WorkflowRequest, lock,
};

/// The primary public API for running memorandum workflows.
///
/// A handle owns one backend and one resolved configuration. It is cheap to
/// clone and every run it starts is independent: runs share no mutable state.
///
/// # Example
///
/// ```rust,no_run
/// use dealmemo_config::{CliArgs, Config};
/// use dealmemo_orchestrator::{OrchestratorHandle, WorkflowRequest};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::discover(&CliArgs::default())?;
/// let handle = OrchestratorHandle::from_config(&config)?;
///
/// let (events, outcome) = handle
///     .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
///     .await;
/// println!("{} events", events.len());
///
/// let document = outcome?;
/// let confirmation = handle.confirm(&document, "Analyze Acme Corp").await;
/// println!("{}", confirmation.message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OrchestratorHandle {
    backend: Arc<dyn LlmBackend>,
    config: Arc<OrchestratorConfig>,
    phases: Vec<Arc<dyn Phase>>,
    schemas: Arc<dyn SchemaLibrary>,
    fallback: Option<LlmFallbackInfo>,
}

impl fmt::Debug for OrchestratorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorHandle")
            .field("provider", &self.backend.provider())
            .field("phases", &self.phases.len())
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl OrchestratorHandle {
    /// Create a handle whose backend is selected by the provider factory.
    ///
    /// # Errors
    ///
    /// Returns `DealmemoError::Config` for invalid phase sections and
    /// `DealmemoError::Llm` when no backend can be constructed.
    pub fn from_config(config: &Config) -> Result<Self, DealmemoError> {
        let orchestrator_config = OrchestratorConfig::from_config(config)?;
        let (backend, fallback) = dealmemo_llm::from_config_with_fallback(config)?;
        let mut handle = Self::with_backend(Arc::from(backend), orchestrator_config);
        handle.fallback = fallback;
        Ok(handle)
    }

    /// Create a handle around an explicit backend.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn LlmBackend>, config: OrchestratorConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            phases: default_pipeline(),
            schemas: Arc::new(BuiltinSchemas),
            fallback: None,
        }
    }

    /// Replace the per-phase schema text.
    #[must_use]
    pub fn with_schemas(mut self, schemas: Arc<dyn SchemaLibrary>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Name of the active provider, used to tag failure messages.
    #[must_use]
    pub fn provider(&self) -> &'static str {
        self.backend.provider()
    }

    /// Set when the configured provider could not be constructed.
    #[must_use]
    pub fn fallback_info(&self) -> Option<&LlmFallbackInfo> {
        self.fallback.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Start a run on the current Tokio runtime.
    ///
    /// Events arrive on `events` in phase order; the stream ends when the
    /// run task ends. Cancel through `cancel`.
    #[must_use]
    pub fn run(&self, request: WorkflowRequest) -> WorkflowRun {
        let run_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));
        let cancel = CancellationToken::new();
        let checkpoint: SharedCheckpoint = Arc::new(Mutex::new(Checkpoint {
            phase: self.phases.first().map_or(PhaseId::DataCollection, |p| p.id()),
            document: Document::seeded_from(&request.document),
        }));

        let workflow = Workflow {
            backend: Arc::clone(&self.backend),
            config: Arc::clone(&self.config),
            phases: self.phases.clone(),
            schemas: Arc::clone(&self.schemas),
            run_id: run_id.clone(),
        };
        let outcome = tokio::spawn(workflow.run(
            request,
            tx,
            cancel.clone(),
            Arc::clone(&checkpoint),
        ));

        WorkflowRun {
            run_id,
            events: ReceiverStream::new(rx),
            cancel,
            outcome,
            checkpoint,
        }
    }

    /// Run to the end, collecting every event.
    pub async fn run_to_completion(
        &self,
        request: WorkflowRequest,
    ) -> (Vec<WorkflowEvent>, Result<Document, WorkflowFailure>) {
        let mut run = self.run(request);
        let mut events = Vec::new();
        while let Some(event) = run.events.next().await {
            events.push(event);
        }
        let outcome = run.finish().await;
        (events, outcome)
    }

    /// Ask the backend for a short summary of a finished run.
    ///
    /// Never fails: backend errors, timeouts and blank answers all degrade
    /// to [`FALLBACK_CONFIRMATION`]. The answer is not merged anywhere.
    pub async fn confirm(&self, document: &Document, request: &str) -> Confirmation {
        let settings = self.config.confirmation();
        let invocation = build_confirmation_invocation(request, document, settings);

        match bounded_call(
            Arc::clone(&self.backend),
            invocation,
            settings.timeout.duration,
            &CancellationToken::new(),
        )
        .await
        {
            Ok(result) => {
                let text = extract_payload(&result);
                let text = text.trim();
                if text.is_empty() || text == EMPTY_PAYLOAD {
                    warn!(provider = %self.provider(), "Confirmation was blank; using fallback");
                    Confirmation::fallback()
                } else {
                    info!(provider = %self.provider(), "Confirmation received");
                    Confirmation {
                        message: text.to_string(),
                        fallback: false,
                    }
                }
            }
            Err(error) => {
                warn!(
                    provider = %self.provider(),
                    error = %error,
                    "Confirmation failed; using fallback"
                );
                Confirmation::fallback()
            }
        }
    }
}

/// A run in progress.
pub struct WorkflowRun {
    pub run_id: String,
    /// Ordered progress events; closed when the run ends
    pub events: ReceiverStream<WorkflowEvent>,
    /// Fire to stop the run; the in-flight call is detached and discarded
    pub cancel: CancellationToken,
    pub outcome: JoinHandle<Result<Document, WorkflowFailure>>,
    checkpoint: SharedCheckpoint,
}

impl fmt::Debug for WorkflowRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRun")
            .field("run_id", &self.run_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl WorkflowRun {
    /// Wait for the run to end.
    ///
    /// Drain `events` first: once the channel buffer is full the run task
    /// waits for a reader.
    ///
    /// # Errors
    ///
    /// Returns the failure with the last-good document. A run task that
    /// panicked is reported as `WorkflowError::TaskFailed`.
    pub async fn finish(self) -> Result<Document, WorkflowFailure> {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let Checkpoint { phase, document } = lock(&self.checkpoint).clone();
                Err(WorkflowFailure {
                    phase,
                    error: WorkflowError::TaskFailed {
                        phase,
                        reason: join_error.to_string(),
                    },
                    document,
                })
            }
        }
    }
}

/// The post-run summary shown to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub message: String,
    /// Whether `message` is the generic fallback
    pub fallback: bool,
}

impl Confirmation {
    fn fallback() -> Self {
        Self {
            message: FALLBACK_CONFIRMATION.to_string(),
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseTimeout;
    use crate::events::{EventStatus, ORCHESTRATOR_AGENT};
    use dealmemo_document::DocumentPatch;
    use dealmemo_llm::{LlmError, LlmInvocation, LlmResult, ScriptedBackend};
    use serde_json::json;
    use std::time::Duration;

    fn acme_answer(inv: &LlmInvocation) -> Result<LlmResult, LlmError> {
        let body = match inv.phase_id {
            Some(PhaseId::DataCollection) => json!({
                "title": "Acme Corp Senior Secured Term Loan",
                "companyOverview": "Acme Corp manufactures industrial anvils."
            }),
            Some(PhaseId::FinancialModeling) => json!({
                "scenarios": [{ "name": "Base Case", "probability": 60, "irr": 12.5, "moic": 1.8 }]
            }),
            Some(PhaseId::RiskAssessment) => json!({
                "risks": [{ "category": "Leverage", "description": "5.2x opening leverage" }]
            }),
            Some(PhaseId::DealStructuring) => json!({
                "termSheet": { "borrower": "Acme Corp", "facilityType": "Term Loan B" }
            }),
            Some(PhaseId::CovenantDesign) => json!({
                "termSheet": { "covenants": [{ "kind": "Maintenance", "name": "Max leverage", "threshold": "5.5x" }] }
            }),
            Some(PhaseId::Writing) => json!({ "recommendation": "Approve", "status": "Review" }),
            None => return Ok(LlmResult::from_text("Memo ready.", "scripted", "scripted-model")),
        };
        Ok(LlmResult::from_text(body.to_string(), "scripted", "scripted-model"))
    }

    fn handle_for(backend: ScriptedBackend) -> OrchestratorHandle {
        OrchestratorHandle::with_backend(Arc::new(backend), OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn test_successful_run_interleaves_active_and_completed() {
        let handle = handle_for(ScriptedBackend::new().with_responder(acme_answer));
        let (events, outcome) = handle
            .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
            .await;

        let doc = outcome.unwrap();
        assert_eq!(events.len(), 12);
        for (pair, phase) in events.chunks(2).zip(PhaseId::ALL) {
            assert_eq!((pair[0].phase, pair[0].status), (phase, EventStatus::Active));
            assert_eq!((pair[1].phase, pair[1].status), (phase, EventStatus::Completed));
            assert!(pair[1].partial_data.is_some());
        }
        assert_eq!(doc.term_sheet.borrower, "Acme Corp");
        assert_eq!(doc.term_sheet.facility_type, "Term Loan B");
        assert_eq!(doc.term_sheet.covenants.len(), 1);
        assert!(doc.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_backend_failure_stops_the_run() {
        let backend = ScriptedBackend::new()
            .with_provider("anthropic")
            .with_responder(|inv| match inv.phase_id {
                Some(PhaseId::RiskAssessment) => {
                    Err(LlmError::ProviderQuota("429 Too Many Requests".into()))
                }
                _ => acme_answer(inv),
            });
        let handle = handle_for(backend.clone());
        let (events, outcome) = handle
            .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
            .await;

        let failure = outcome.unwrap_err();
        assert_eq!(failure.phase, PhaseId::RiskAssessment);
        assert_eq!(backend.call_count(), 3);
        assert_eq!(events.len(), 6);

        let failed: Vec<_> = events
            .iter()
            .filter(|e| e.status == EventStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].agent, ORCHESTRATOR_AGENT);
        assert_eq!(
            failed[0].message,
            "[anthropic] Risk Assessment failed: provider quota exceeded"
        );

        // Last-good state is the document after Financial Modeling.
        assert_eq!(failure.document.scenarios.len(), 1);
        assert!(failure.document.risks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_phase_times_out() {
        let backend = ScriptedBackend::new()
            .with_delay(Duration::from_secs(60))
            .with_responder(acme_answer);
        let config = OrchestratorConfig::default().with_timeout(PhaseTimeout::from_secs(5));
        let handle = OrchestratorHandle::with_backend(Arc::new(backend), config);

        let (events, outcome) = handle
            .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
            .await;

        let failure = outcome.unwrap_err();
        assert!(matches!(
            failure.error,
            WorkflowError::Timeout { phase: PhaseId::DataCollection, duration }
                if duration == Duration::from_secs(5)
        ));
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1].message,
            "[scripted] Data Collection failed: timed out after 5s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_in_flight_call() {
        let backend = ScriptedBackend::new()
            .with_delay(Duration::from_secs(60))
            .with_responder(acme_answer);
        let handle = handle_for(backend.clone());

        let mut seed = Document::new();
        seed.title = "Existing draft".into();
        let mut run = handle.run(WorkflowRequest::new("Analyze Acme Corp").with_document(seed));

        let first = run.events.next().await.unwrap();
        assert_eq!(first.status, EventStatus::Active);
        run.cancel.cancel();

        let mut rest = Vec::new();
        while let Some(event) = run.events.next().await {
            rest.push(event);
        }
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].status, EventStatus::Failed);
        assert_eq!(rest[0].agent, ORCHESTRATOR_AGENT);

        let failure = run.finish().await.unwrap_err();
        assert!(matches!(failure.error, WorkflowError::Cancelled { .. }));
        assert_eq!(failure.document.title, "Existing draft");
        assert!(backend.call_count() <= 1);
    }

    #[tokio::test]
    async fn test_backend_panic_is_task_failure() {
        let backend = ScriptedBackend::new().with_responder(|_| panic!("backend exploded"));
        let handle = handle_for(backend);
        let (_, outcome) = handle
            .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
            .await;
        assert!(matches!(
            outcome.unwrap_err().error,
            WorkflowError::TaskFailed { phase: PhaseId::DataCollection, .. }
        ));
    }

    #[tokio::test]
    async fn test_resumed_run_keeps_fields_no_phase_rewrites() {
        let handle = handle_for(ScriptedBackend::new().with_responder(acme_answer));
        let mut previous = Document::new();
        previous.apply(DocumentPatch {
            industry_analysis: Some("Industrial tools, mid-cycle".into()),
            ..Default::default()
        });

        let (_, outcome) = handle
            .run_to_completion(WorkflowRequest::new("Analyze Acme Corp").with_document(previous))
            .await;
        let doc = outcome.unwrap();
        assert_eq!(doc.industry_analysis, "Industrial tools, mid-cycle");
        assert_eq!(doc.title, "Acme Corp Senior Secured Term Loan");
    }

    #[tokio::test]
    async fn test_confirm_returns_backend_text() {
        let handle = handle_for(ScriptedBackend::new().with_responder(acme_answer));
        let confirmation = handle.confirm(&Document::new(), "Analyze Acme Corp").await;
        assert_eq!(confirmation.message, "Memo ready.");
        assert!(!confirmation.fallback);
    }

    #[tokio::test]
    async fn test_confirm_degrades_to_fallback() {
        let backend = ScriptedBackend::new();
        backend.push_error(LlmError::ProviderOutage("503".into()));
        backend.push_text("   ");
        let handle = handle_for(backend);

        for _ in 0..2 {
            let confirmation = handle.confirm(&Document::new(), "Analyze Acme Corp").await;
            assert!(confirmation.fallback);
            assert_eq!(confirmation.message, FALLBACK_CONFIRMATION);
        }
    }
}

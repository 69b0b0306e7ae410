//! Multi-phase workflow execution.
//!
//! Phases run strictly in order; each one reads the document as merged by
//! every phase before it. The first failure stops the run after a single
//! `failed` event, leaving the document at its last-good state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dealmemo_document::{Document, check_model};
use dealmemo_llm::{Attachment, LlmBackend};
use dealmemo_phase_api::{Phase, PhaseContext, PhaseId, SchemaLibrary};
use dealmemo_utils::error::WorkflowError;
use dealmemo_utils::logging::phase_span;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::events::WorkflowEvent;
use crate::phase_exec::execute_phase;

/// Input to one run.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRequest {
    /// Free-text request, e.g. "Analyze Acme Corp"
    pub request: String,
    /// Supplied to Data Collection only
    pub attachments: Vec<Attachment>,
    /// Previously accumulated document to resume from; empty for a fresh run
    pub document: Document,
}

impl WorkflowRequest {
    #[must_use]
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = document;
        self
    }
}

/// A run that stopped before Writing completed.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct WorkflowFailure {
    pub phase: PhaseId,
    #[source]
    pub error: WorkflowError,
    /// The document as merged through the last successful phase
    pub document: Document,
}

/// Progress shared with the run's handle so a panicking task still leaves
/// the last-good document behind.
#[derive(Debug, Clone)]
pub(crate) struct Checkpoint {
    pub phase: PhaseId,
    pub document: Document,
}

pub(crate) type SharedCheckpoint = Arc<Mutex<Checkpoint>>;

pub(crate) fn lock(checkpoint: &SharedCheckpoint) -> MutexGuard<'_, Checkpoint> {
    checkpoint.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a run task owns.
pub(crate) struct Workflow {
    pub backend: Arc<dyn LlmBackend>,
    pub config: Arc<OrchestratorConfig>,
    pub phases: Vec<Arc<dyn Phase>>,
    pub schemas: Arc<dyn SchemaLibrary>,
    pub run_id: String,
}

impl Workflow {
    pub(crate) async fn run(
        self,
        request: WorkflowRequest,
        events: mpsc::Sender<WorkflowEvent>,
        cancel: CancellationToken,
        checkpoint: SharedCheckpoint,
    ) -> Result<Document, WorkflowFailure> {
        let provider = self.backend.provider();
        let mut document = Document::seeded_from(&request.document);
        info!(
            run_id = %self.run_id,
            provider = %provider,
            attachments = request.attachments.len(),
            "Starting memorandum run"
        );

        for phase in &self.phases {
            let phase_id = phase.id();
            lock(&checkpoint).phase = phase_id;

            let outcome = async {
                emit(&events, WorkflowEvent::active(phase_id)).await;
                let ctx = PhaseContext {
                    request: &request.request,
                    document: &document,
                    attachments: &request.attachments,
                    schemas: self.schemas.as_ref(),
                };
                execute_phase(
                    &self.backend,
                    phase.as_ref(),
                    &ctx,
                    self.config.phase(phase_id),
                    &self.run_id,
                    &cancel,
                )
                .await
            }
            .instrument(phase_span(&self.run_id, phase_id.as_str(), provider))
            .await;

            match outcome {
                Ok(execution) => {
                    document.apply(execution.patch.clone());
                    if phase_id == PhaseId::FinancialModeling {
                        for issue in check_model(&document.financial_model) {
                            warn!(run_id = %self.run_id, issue = %issue, "Financial model check");
                        }
                    }
                    lock(&checkpoint).document = document.clone();
                    debug!(
                        phase = %phase_id,
                        model = %execution.model_used,
                        "Merged phase patch"
                    );
                    emit(&events, WorkflowEvent::completed(phase_id, execution.patch)).await;
                }
                Err(error) => {
                    emit(
                        &events,
                        WorkflowEvent::failed(phase_id, error.public_message(provider)),
                    )
                    .await;
                    return Err(WorkflowFailure {
                        phase: phase_id,
                        error,
                        document,
                    });
                }
            }
        }

        match document.fingerprint() {
            Ok(fingerprint) => {
                info!(run_id = %self.run_id, fingerprint = %fingerprint, "Memorandum complete");
            }
            Err(e) => debug!(run_id = %self.run_id, error = %e, "Could not fingerprint document"),
        }
        Ok(document)
    }
}

/// Send an event; a reader that went away does not stop the run.
async fn emit(events: &mpsc::Sender<WorkflowEvent>, event: WorkflowEvent) {
    let status = event.status;
    if events.send(event).await.is_err() {
        debug!(status = %status, "Event receiver dropped");
    }
}

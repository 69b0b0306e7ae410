//! End-to-end workflow scenarios against a scripted backend
//!
//! These drive the public `OrchestratorHandle` API exactly as an embedding
//! service would, with `ScriptedBackend` standing in for the provider. No
//! network access is needed.

use std::sync::Arc;
use std::time::Duration;

use dealmemo::error::WorkflowError;
use dealmemo::{
    Attachment, DealmemoError, Document, EventStatus, ExitCode, OrchestratorConfig,
    OrchestratorHandle, PhaseId, PhaseTimeout, WorkflowEvent, WorkflowRequest,
};
use dealmemo_llm::{LlmError, LlmInvocation, LlmResult, ScriptedBackend};
use serde_json::json;

const ORCHESTRATOR: &str = "Orchestrator";

fn reply(body: serde_json::Value) -> Result<LlmResult, LlmError> {
    Ok(LlmResult::from_text(body.to_string(), "scripted", "scripted-model"))
}

/// A well-behaved analyst team for "Analyze Acme Corp".
fn acme(inv: &LlmInvocation) -> Result<LlmResult, LlmError> {
    match inv.phase_id {
        Some(PhaseId::DataCollection) => reply(json!({
            "title": "Acme Corp Credit Memo",
            "companyOverview": "Acme Corp is a mid-market maker of road-runner countermeasures.",
            "industryAnalysis": "Fragmented, cyclical demand."
        })),
        Some(PhaseId::FinancialModeling) => reply(json!({
            "scenarios": [
                { "name": "Base Case", "probability": 60, "irr": 11.2, "moic": 1.6 },
                { "name": "Downside Case", "probability": 25, "irr": 4.0, "moic": 1.1 }
            ]
        })),
        Some(PhaseId::RiskAssessment) => reply(json!({
            "risks": [
                { "category": "Customer concentration", "description": "Top client is 40% of revenue" }
            ]
        })),
        Some(PhaseId::DealStructuring) => reply(json!({
            "termSheet": { "borrower": "Acme Corp", "facilityType": "Unitranche" }
        })),
        Some(PhaseId::CovenantDesign) => reply(json!({
            "termSheet": {
                "covenants": [{ "kind": "Maintenance", "name": "Total leverage", "threshold": "5.0x" }]
            }
        })),
        Some(PhaseId::Writing) => reply(json!({
            "recommendation": "Approve subject to diligence",
            "status": "Review"
        })),
        None => Ok(LlmResult::from_text(
            "Memo for Acme Corp is ready for committee.",
            "scripted",
            "scripted-model",
        )),
    }
}

fn handle(backend: &ScriptedBackend) -> OrchestratorHandle {
    OrchestratorHandle::with_backend(Arc::new(backend.clone()), OrchestratorConfig::default())
}

fn statuses(events: &[WorkflowEvent]) -> Vec<(PhaseId, EventStatus)> {
    events.iter().map(|e| (e.phase, e.status)).collect()
}

#[tokio::test]
async fn test_acme_run_builds_complete_memo() {
    let backend = ScriptedBackend::new().with_responder(acme);
    let (events, outcome) = handle(&backend)
        .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
        .await;

    let memo = outcome.unwrap();
    let completed: Vec<_> = events
        .iter()
        .filter(|e| e.status == EventStatus::Completed)
        .map(|e| e.phase)
        .collect();
    assert_eq!(completed, PhaseId::ALL.to_vec());

    assert_eq!(memo.title, "Acme Corp Credit Memo");
    assert_eq!(memo.term_sheet.borrower, "Acme Corp");
    assert_eq!(memo.term_sheet.facility_type, "Unitranche");
    assert_eq!(memo.term_sheet.covenants.len(), 1);
    assert_eq!(memo.risks.len(), 1);
    assert!(memo.scenario("base case").is_some());
    assert!(memo.last_updated.is_some());
    assert_eq!(backend.call_count(), 6);
}

#[tokio::test]
async fn test_events_alternate_active_then_terminal() {
    let backend = ScriptedBackend::new().with_responder(acme);
    let (events, _) = handle(&backend)
        .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
        .await;

    let expected: Vec<_> = PhaseId::ALL
        .into_iter()
        .flat_map(|p| [(p, EventStatus::Active), (p, EventStatus::Completed)])
        .collect();
    assert_eq!(statuses(&events), expected);

    let ids: std::collections::HashSet<_> = events.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), events.len());
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_later_phases_see_earlier_results() {
    let backend = ScriptedBackend::new().with_responder(acme);
    let (_, outcome) = handle(&backend)
        .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
        .await;
    outcome.unwrap();

    let calls = backend.invocations();
    let phases: Vec<_> = calls.iter().map(|c| c.phase_id).collect();
    assert_eq!(phases, PhaseId::ALL.map(Some).to_vec());

    let modeling = &calls[1];
    assert!(modeling.content.contains("road-runner countermeasures"));
    let risk = &calls[2];
    assert!(risk.content.contains("Downside Case"));

    let run_ids: std::collections::HashSet<_> =
        calls.iter().map(|c| c.metadata["run_id"].to_string()).collect();
    assert_eq!(run_ids.len(), 1);
}

#[tokio::test]
async fn test_attachments_reach_data_collection_only() {
    let backend = ScriptedBackend::new().with_responder(acme);
    let deck = Attachment::from_bytes("deck.pdf", "application/pdf", b"%PDF-1.7");
    let request = WorkflowRequest::new("Analyze Acme Corp").with_attachments(vec![deck]);

    let (_, outcome) = handle(&backend).run_to_completion(request).await;
    outcome.unwrap();

    let calls = backend.invocations();
    assert_eq!(calls[0].attachments.len(), 1);
    assert_eq!(calls[0].attachments[0].name, "deck.pdf");
    assert!(calls[1..].iter().all(|c| c.attachments.is_empty()));
}

#[tokio::test]
async fn test_prose_answer_fails_first_phase() {
    let backend = ScriptedBackend::new();
    backend.push_text("not json");

    let (events, outcome) = handle(&backend)
        .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
        .await;

    assert_eq!(
        statuses(&events),
        vec![
            (PhaseId::DataCollection, EventStatus::Active),
            (PhaseId::DataCollection, EventStatus::Failed),
        ]
    );
    assert_eq!(events[1].agent, ORCHESTRATOR);

    let failure = outcome.unwrap_err();
    assert!(matches!(failure.error, WorkflowError::MalformedOutput { .. }));
    assert!(failure.document.title.is_empty());
    assert!(failure.document.company_overview.is_empty());
    assert_eq!(
        DealmemoError::Workflow(failure.error).to_exit_code(),
        ExitCode::MALFORMED_OUTPUT
    );
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_fenced_answer_is_accepted() {
    let backend = ScriptedBackend::new().with_responder(acme);
    backend.push_text("```json\n{\"companyOverview\": \"X\"}\n```");

    let (events, outcome) = handle(&backend)
        .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
        .await;

    let memo = outcome.unwrap();
    assert_eq!(memo.company_overview, "X");
    assert_eq!(events[1].message, "Data Collection completed, 1 field updated");
}

#[tokio::test]
async fn test_empty_object_leaves_document_untouched() {
    let backend = ScriptedBackend::new().with_responder(acme);
    backend.push_text("{}");

    let mut seed = Document::default();
    seed.title = "Draft".into();
    let request = WorkflowRequest::new("Analyze Acme Corp").with_document(seed);
    let (events, outcome) = handle(&backend).run_to_completion(request).await;

    assert_eq!(events[1].message, "Data Collection completed with no changes");
    assert_eq!(outcome.unwrap().title, "Draft");
}

#[tokio::test]
async fn test_backend_error_keeps_last_good_document() {
    let backend = ScriptedBackend::new().with_responder(|inv| match inv.phase_id {
        Some(PhaseId::DealStructuring) => Err(LlmError::ProviderOutage("503".into())),
        _ => acme(inv),
    });

    let (events, outcome) = handle(&backend)
        .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
        .await;

    let failure = outcome.unwrap_err();
    assert_eq!(failure.phase, PhaseId::DealStructuring);
    assert_eq!(failure.document.risks.len(), 1);
    assert!(failure.document.term_sheet.borrower.is_empty());
    assert_eq!(backend.call_count(), 4);

    let last = events.last().unwrap();
    assert_eq!(last.status, EventStatus::Failed);
    assert!(last.message.starts_with("[scripted] Deal Structuring failed"));
    assert!(
        !events
            .iter()
            .any(|e| e.phase == PhaseId::CovenantDesign || e.phase == PhaseId::Writing)
    );
}

#[tokio::test(start_paused = true)]
async fn test_per_phase_timeout_applies_to_that_phase() {
    let backend = ScriptedBackend::new()
        .with_delay(Duration::from_secs(30))
        .with_responder(acme);
    let config = OrchestratorConfig::default()
        .with_timeout(PhaseTimeout::from_secs(60))
        .with_phase_timeout(PhaseId::RiskAssessment, PhaseTimeout::from_secs(10));

    let handle = OrchestratorHandle::with_backend(Arc::new(backend), config);
    let (_, outcome) = handle
        .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
        .await;

    let failure = outcome.unwrap_err();
    assert!(matches!(
        failure.error,
        WorkflowError::Timeout { phase: PhaseId::RiskAssessment, .. }
    ));
    assert_eq!(failure.document.scenarios.len(), 2);
}

#[tokio::test]
async fn test_confirmation_uses_backend_text() {
    let backend = ScriptedBackend::new().with_responder(acme);
    let handle = handle(&backend);
    let (_, outcome) = handle
        .run_to_completion(WorkflowRequest::new("Analyze Acme Corp"))
        .await;
    let memo = outcome.unwrap();

    let confirmation = handle.confirm(&memo, "Analyze Acme Corp").await;
    assert!(!confirmation.fallback);
    assert_eq!(confirmation.message, "Memo for Acme Corp is ready for committee.");

    let last = backend.invocations().pop().unwrap();
    assert!(last.phase_id.is_none());
    assert!(last.attachments.is_empty());
}

#[tokio::test]
async fn test_confirmation_failure_falls_back() {
    let backend = ScriptedBackend::new();
    backend.push_error(LlmError::Transport("connection reset".into()));

    let confirmation = handle(&backend)
        .confirm(&Document::default(), "Analyze Acme Corp")
        .await;
    assert!(confirmation.fallback);
    assert!(confirmation.message.contains("ready for review"));
}

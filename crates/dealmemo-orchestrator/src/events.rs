//! Progress events: the run's audit trail.
//!
//! Events are created once per phase per status transition and never
//! mutated. A successful run emits exactly twelve of them, `active` then
//! `completed` for each phase in order.

use chrono::{DateTime, Utc};
use dealmemo_document::DocumentPatch;
use dealmemo_phase_api::PhaseId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agent name attached to `failed` events.
pub const ORCHESTRATOR_AGENT: &str = "Orchestrator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One immutable progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEvent {
    pub id: Uuid,
    pub phase: PhaseId,
    /// Phase label, or [`ORCHESTRATOR_AGENT`] for failures
    pub agent: String,
    pub status: EventStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// The patch merged by a `completed` phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_data: Option<DocumentPatch>,
}

impl WorkflowEvent {
    fn new(phase: PhaseId, agent: impl Into<String>, status: EventStatus, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase,
            agent: agent.into(),
            status,
            message,
            timestamp: Utc::now(),
            partial_data: None,
        }
    }

    pub(crate) fn pending(phase: PhaseId) -> Self {
        Self::new(
            phase,
            phase.label(),
            EventStatus::Pending,
            format!("{} is queued", phase.label()),
        )
    }

    pub(crate) fn active(phase: PhaseId) -> Self {
        Self::new(
            phase,
            phase.label(),
            EventStatus::Active,
            format!("{} started", phase.label()),
        )
    }

    pub(crate) fn completed(phase: PhaseId, patch: DocumentPatch) -> Self {
        let fields = patch.present_fields().len();
        let message = match fields {
            0 => format!("{} completed with no changes", phase.label()),
            1 => format!("{} completed, 1 field updated", phase.label()),
            n => format!("{} completed, {n} fields updated", phase.label()),
        };
        let mut event = Self::new(phase, phase.label(), EventStatus::Completed, message);
        event.partial_data = Some(patch);
        event
    }

    /// Failure event; `message` must already be public (tagged and redacted).
    pub(crate) fn failed(phase: PhaseId, message: String) -> Self {
        Self::new(phase, ORCHESTRATOR_AGENT, EventStatus::Failed, message)
    }

    /// Whether this event ends its phase.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, EventStatus::Completed | EventStatus::Failed)
    }
}

/// The `pending` plan for a run, one event per phase in run order.
///
/// These are for display before a run starts; they are never sent on a
/// run's event stream.
#[must_use]
pub fn planned_events() -> Vec<WorkflowEvent> {
    PhaseId::ALL.into_iter().map(WorkflowEvent::pending).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planned_events_are_pending_in_order() {
        let plan = planned_events();
        assert_eq!(plan.len(), 6);
        assert!(plan.iter().all(|e| e.status == EventStatus::Pending));
        let phases: Vec<PhaseId> = plan.iter().map(|e| e.phase).collect();
        assert_eq!(phases, PhaseId::ALL.to_vec());
        assert_eq!(plan[3].agent, "Deal Structuring");
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = WorkflowEvent::active(PhaseId::Writing);
        let b = WorkflowEvent::active(PhaseId::Writing);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_completed_event_serializes_camel_case() {
        let patch = DocumentPatch {
            company_overview: Some("Anvils".into()),
            ..Default::default()
        };
        let event = WorkflowEvent::completed(PhaseId::DataCollection, patch);
        assert_eq!(event.message, "Data Collection completed, 1 field updated");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["phase"], "data_collection");
        assert_eq!(json["agent"], "Data Collection");
        assert_eq!(json["partialData"]["companyOverview"], "Anvils");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_failed_event_is_orchestrator_tagged() {
        let event = WorkflowEvent::failed(PhaseId::RiskAssessment, "[gemini] boom".into());
        assert_eq!(event.agent, ORCHESTRATOR_AGENT);
        assert!(event.is_terminal());
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("partialData").is_none());
    }
}

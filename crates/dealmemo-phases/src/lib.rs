//! Concrete implementations of the memorandum phases
//!
//! Six phases run in order: Data Collection, Financial Modeling, Risk
//! Assessment, Deal Structuring, Covenant Design and Writing. Each builds its
//! context from the document merged so far and returns a patch limited to the
//! fields it owns.

mod confirmation;
mod context;
mod definitions;
mod profiles;
mod schemas;

use std::sync::Arc;

use dealmemo_phase_api::{Phase, PhaseId};

pub use confirmation::{CONFIRMATION_INSTRUCTIONS, FALLBACK_CONFIRMATION, confirmation_prompt};
pub use definitions::{
    COVENANT_DESIGN_FIELDS, CovenantDesignPhase, DATA_COLLECTION_FIELDS, DEAL_STRUCTURING_FIELDS,
    DataCollectionPhase, DealStructuringPhase, FINANCIAL_MODELING_FIELDS, FinancialModelingPhase,
    RISK_ASSESSMENT_FIELDS, RiskAssessmentPhase, WRITING_FIELDS, WRITING_REFINABLE_FIELDS,
    WritingPhase,
};
pub use profiles::{
    PlannedPhase, confirmation_profile, default_profile, plan, resolve_confirmation_profile,
    resolve_profile,
};
pub use schemas::BuiltinSchemas;

/// The phase implementation for an id.
#[must_use]
pub fn phase_for(id: PhaseId) -> Arc<dyn Phase> {
    match id {
        PhaseId::DataCollection => Arc::new(DataCollectionPhase),
        PhaseId::FinancialModeling => Arc::new(FinancialModelingPhase),
        PhaseId::RiskAssessment => Arc::new(RiskAssessmentPhase),
        PhaseId::DealStructuring => Arc::new(DealStructuringPhase),
        PhaseId::CovenantDesign => Arc::new(CovenantDesignPhase),
        PhaseId::Writing => Arc::new(WritingPhase),
    }
}

/// All six phases in run order.
#[must_use]
pub fn default_pipeline() -> Vec<Arc<dyn Phase>> {
    PhaseId::ALL.into_iter().map(phase_for).collect()
}

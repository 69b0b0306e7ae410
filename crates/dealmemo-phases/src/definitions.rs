//! The six memorandum phases.
//!
//! Each phase owns a disjoint slice of the document. Writing may also refine
//! term-sheet fields set by Deal Structuring and Covenant Design.

use chrono::{NaiveDate, Utc};
use dealmemo_document::{DocumentPatch, PatchField};
use dealmemo_llm::Attachment;
use dealmemo_phase_api::{InvocationProfile, Phase, PhaseContext, PhaseId, parse_patch};
use dealmemo_utils::error::WorkflowError;

use crate::context::{ContextBuilder, instructions};
use crate::profiles::default_profile;

pub const DATA_COLLECTION_FIELDS: &[PatchField] = &[
    PatchField::Title,
    PatchField::CompanyOverview,
    PatchField::IndustryAnalysis,
];

pub const FINANCIAL_MODELING_FIELDS: &[PatchField] =
    &[PatchField::FinancialModel, PatchField::Scenarios];

pub const RISK_ASSESSMENT_FIELDS: &[PatchField] = &[PatchField::Risks, PatchField::Waterfall];

pub const DEAL_STRUCTURING_FIELDS: &[PatchField] = &[
    PatchField::TermBorrower,
    PatchField::TermFacilityType,
    PatchField::TermAmount,
    PatchField::TermCurrency,
    PatchField::TermTenor,
    PatchField::TermBenchmark,
    PatchField::TermMargin,
    PatchField::TermFloor,
    PatchField::TermAllInRate,
    PatchField::TermRepaymentType,
    PatchField::TermFees,
    PatchField::TermAmortization,
    PatchField::CapitalStructure,
];

pub const COVENANT_DESIGN_FIELDS: &[PatchField] = &[
    PatchField::TermCovenants,
    PatchField::TermConditionsPrecedent,
    PatchField::TermReportingRequirements,
];

pub const WRITING_FIELDS: &[PatchField] = &[
    PatchField::ExecutiveSummary,
    PatchField::InvestmentThesis,
    PatchField::KeyHighlights,
    PatchField::Recommendation,
    PatchField::Status,
    PatchField::LastUpdated,
];

/// Term-sheet paths Writing may refine.
pub const WRITING_REFINABLE_FIELDS: &[PatchField] = &[
    PatchField::TermBorrower,
    PatchField::TermFacilityType,
    PatchField::TermAmount,
    PatchField::TermCurrency,
    PatchField::TermTenor,
    PatchField::TermBenchmark,
    PatchField::TermMargin,
    PatchField::TermFloor,
    PatchField::TermAllInRate,
    PatchField::TermRepaymentType,
    PatchField::TermFees,
    PatchField::TermAmortization,
    PatchField::TermCovenants,
    PatchField::TermConditionsPrecedent,
    PatchField::TermReportingRequirements,
];

/// Research: company, industry and any supplied source material.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataCollectionPhase;

impl Phase for DataCollectionPhase {
    fn id(&self) -> PhaseId {
        PhaseId::DataCollection
    }

    fn owned_fields(&self) -> &'static [PatchField] {
        DATA_COLLECTION_FIELDS
    }

    fn profile(&self) -> InvocationProfile {
        default_profile(self.id())
    }

    fn instructions(&self, ctx: &PhaseContext<'_>) -> String {
        instructions(
            "You are a senior credit research analyst at a private credit fund.",
            "Collect the facts needed to underwrite the requested credit: who the borrower is, \
             what it does, how it makes money, and the industry it competes in. Prefer facts \
             from the attached materials; use search only to fill gaps.",
            &ctx.schemas.schema(self.id()),
        )
    }

    fn prompt(&self, ctx: &PhaseContext<'_>) -> String {
        let names: Vec<&str> = ctx.attachments.iter().map(|a| a.name.as_str()).collect();
        ContextBuilder::new(ctx.request)
            .section("Attached materials", &names)
            .section("Existing title", &ctx.document.title)
            .section("Existing company overview", &ctx.document.company_overview)
            .build()
    }

    fn attachments(&self, ctx: &PhaseContext<'_>) -> Vec<Attachment> {
        ctx.attachments.to_vec()
    }
}

/// Projections, financial model and return scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinancialModelingPhase;

impl Phase for FinancialModelingPhase {
    fn id(&self) -> PhaseId {
        PhaseId::FinancialModeling
    }

    fn owned_fields(&self) -> &'static [PatchField] {
        FINANCIAL_MODELING_FIELDS
    }

    fn profile(&self) -> InvocationProfile {
        default_profile(self.id())
    }

    fn instructions(&self, ctx: &PhaseContext<'_>) -> String {
        instructions(
            "You are a leveraged finance modeling specialist.",
            "Build a five-year operating and debt model for the borrower and derive Base, \
             Upside and Downside return scenarios. Label the revenue, EBITDA and total debt \
             rows with the ids revenue, ebitda and total_debt.",
            &ctx.schemas.schema(self.id()),
        )
    }

    fn prompt(&self, ctx: &PhaseContext<'_>) -> String {
        let doc = ctx.document;
        ContextBuilder::new(ctx.request)
            .section("Company overview", &doc.company_overview)
            .section("Industry analysis", &doc.industry_analysis)
            .section("Current financial model", &doc.financial_model)
            .build()
    }
}

/// Risk register and liquidation waterfall.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAssessmentPhase;

impl Phase for RiskAssessmentPhase {
    fn id(&self) -> PhaseId {
        PhaseId::RiskAssessment
    }

    fn owned_fields(&self) -> &'static [PatchField] {
        RISK_ASSESSMENT_FIELDS
    }

    fn profile(&self) -> InvocationProfile {
        default_profile(self.id())
    }

    fn instructions(&self, ctx: &PhaseContext<'_>) -> String {
        instructions(
            "You are a credit risk officer reviewing a proposed loan.",
            "Identify the principal credit risks with mitigants and rate each one. Estimate \
             recoveries in a default by building a liquidation waterfall from most to least senior.",
            &ctx.schemas.schema(self.id()),
        )
    }

    fn prompt(&self, ctx: &PhaseContext<'_>) -> String {
        let doc = ctx.document;
        ContextBuilder::new(ctx.request)
            .section("Company overview", &doc.company_overview)
            .section("Industry analysis", &doc.industry_analysis)
            .section("Scenarios", &doc.scenarios)
            .section("Financial model", &doc.financial_model)
            .build()
    }
}

/// Facility terms, pricing, fees, amortization and capital structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DealStructuringPhase;

impl Phase for DealStructuringPhase {
    fn id(&self) -> PhaseId {
        PhaseId::DealStructuring
    }

    fn owned_fields(&self) -> &'static [PatchField] {
        DEAL_STRUCTURING_FIELDS
    }

    fn profile(&self) -> InvocationProfile {
        default_profile(self.id())
    }

    fn instructions(&self, ctx: &PhaseContext<'_>) -> String {
        instructions(
            "You are a direct lending deal structurer.",
            "Propose facility terms sized to the borrower's cash flows and risk profile: \
             amount, tenor, pricing over the benchmark, fees, amortization and the resulting \
             pro forma capital structure.",
            &ctx.schemas.schema(self.id()),
        )
    }

    fn prompt(&self, ctx: &PhaseContext<'_>) -> String {
        let doc = ctx.document;
        ContextBuilder::new(ctx.request)
            .section("Title", &doc.title)
            .section("Company overview", &doc.company_overview)
            .section("Scenarios", &doc.scenarios)
            .section("Risks", &doc.risks)
            .section("Existing capital structure", &doc.capital_structure)
            .section("Term sheet so far", &doc.term_sheet)
            .build()
    }
}

/// Covenant package, conditions precedent and reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct CovenantDesignPhase;

impl Phase for CovenantDesignPhase {
    fn id(&self) -> PhaseId {
        PhaseId::CovenantDesign
    }

    fn owned_fields(&self) -> &'static [PatchField] {
        COVENANT_DESIGN_FIELDS
    }

    fn profile(&self) -> InvocationProfile {
        default_profile(self.id())
    }

    fn instructions(&self, ctx: &PhaseContext<'_>) -> String {
        instructions(
            "You are a loan documentation specialist.",
            "Design maintenance and negative covenants with headroom to the Base Case, the \
             conditions precedent to funding, and the borrower's ongoing reporting obligations.",
            &ctx.schemas.schema(self.id()),
        )
    }

    fn prompt(&self, ctx: &PhaseContext<'_>) -> String {
        let doc = ctx.document;
        ContextBuilder::new(ctx.request)
            .section("Term sheet", &doc.term_sheet)
            .section("Risks", &doc.risks)
            .section("Scenarios", &doc.scenarios)
            .build()
    }
}

/// Narrative sections and the final recommendation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WritingPhase;

impl WritingPhase {
    /// Parse with an explicit stamp date for `lastUpdated`.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::MalformedOutput` if the payload is not a JSON object.
    pub fn postprocess_on(
        &self,
        raw: &str,
        today: NaiveDate,
    ) -> Result<DocumentPatch, WorkflowError> {
        let mut patch = parse_patch(self.id(), raw, &self.writable_fields())?;
        patch.last_updated = Some(today);
        Ok(patch)
    }
}

impl Phase for WritingPhase {
    fn id(&self) -> PhaseId {
        PhaseId::Writing
    }

    fn owned_fields(&self) -> &'static [PatchField] {
        WRITING_FIELDS
    }

    fn refinable_fields(&self) -> &'static [PatchField] {
        WRITING_REFINABLE_FIELDS
    }

    fn profile(&self) -> InvocationProfile {
        default_profile(self.id())
    }

    fn instructions(&self, ctx: &PhaseContext<'_>) -> String {
        instructions(
            "You are the lead author of an investment committee credit memorandum.",
            "Write the executive summary, investment thesis and key highlights from the \
             analysis below and give a clear recommendation. Correct a term sheet field only \
             when it contradicts the analysis.",
            &ctx.schemas.schema(self.id()),
        )
    }

    fn prompt(&self, ctx: &PhaseContext<'_>) -> String {
        ContextBuilder::new(ctx.request)
            .section("Memorandum so far", ctx.document)
            .build()
    }

    fn postprocess(
        &self,
        raw: &str,
        _ctx: &PhaseContext<'_>,
    ) -> Result<DocumentPatch, WorkflowError> {
        self.postprocess_on(raw, Utc::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::BuiltinSchemas;
    use dealmemo_document::{Document, MemoStatus};

    fn ctx<'a>(doc: &'a Document, attachments: &'a [Attachment]) -> PhaseContext<'a> {
        PhaseContext {
            request: "Analyze Acme Corp",
            document: doc,
            attachments,
            schemas: &BuiltinSchemas,
        }
    }

    #[test]
    fn test_only_data_collection_forwards_attachments() {
        let doc = Document::new();
        let files = [Attachment::new("cim.pdf", "application/pdf", "JVBERi0=")];
        let c = ctx(&doc, &files);

        assert_eq!(DataCollectionPhase.attachments(&c).len(), 1);
        assert!(DataCollectionPhase.prompt(&c).contains("cim.pdf"));
        assert!(FinancialModelingPhase.attachments(&c).is_empty());
        assert!(WritingPhase.attachments(&c).is_empty());
    }

    #[test]
    fn test_prompts_embed_prior_results() {
        let mut doc = Document::new();
        doc.company_overview = "Acme makes industrial anvils.".into();
        doc.term_sheet.borrower = "Acme Corp".into();
        let c = ctx(&doc, &[]);

        let modeling = FinancialModelingPhase.prompt(&c);
        assert!(modeling.starts_with("# Request\n\nAnalyze Acme Corp"));
        assert!(modeling.contains("industrial anvils"));

        let covenants = CovenantDesignPhase.prompt(&c);
        assert!(covenants.contains("\"borrower\": \"Acme Corp\""));
    }

    #[test]
    fn test_instructions_include_schema() {
        let doc = Document::new();
        let c = ctx(&doc, &[]);
        let text = RiskAssessmentPhase.instructions(&c);
        assert!(text.contains("\"residualRisk\""));
        assert!(text.contains("single JSON object"));
    }

    #[test]
    fn test_covenant_phase_cannot_touch_pricing() {
        let doc = Document::new();
        let raw = r#"{"termSheet":{"margin":"S+900","covenants":[{"kind":"Maintenance","name":"Max Leverage","threshold":"5.0x"}]}}"#;
        let patch = CovenantDesignPhase.postprocess(raw, &ctx(&doc, &[])).unwrap();
        let term_sheet = patch.term_sheet.unwrap();
        assert!(term_sheet.margin.is_none());
        assert_eq!(term_sheet.covenants.unwrap().len(), 1);
    }

    #[test]
    fn test_writing_stamps_date_and_may_refine_terms() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let raw = r#"{"recommendation":"Approve","status":"review","termSheet":{"tenor":"6 years"},"risks":[{"category":"x"}]}"#;
        let patch = WritingPhase.postprocess_on(raw, today).unwrap();

        assert_eq!(patch.last_updated, Some(today));
        assert_eq!(patch.status, Some(MemoStatus::Review));
        assert_eq!(patch.recommendation.as_deref(), Some("Approve"));
        assert_eq!(patch.term_sheet.unwrap().tenor.as_deref(), Some("6 years"));
        assert!(patch.risks.is_none());
    }
}

//! Field-wise merge of patches into the document.
//!
//! `merge(document, patch)` takes each patch field that is present and
//! non-empty and keeps the document's value otherwise. Sub-records merge
//! recursively through the same [`overlay`] rule, so a later phase can add
//! covenants to a term sheet without erasing its pricing.

use crate::model::{Document, FinancialModel, Scenario, TermSheet, scenario_key};
use crate::patch::{DocumentPatch, FinancialModelPatch, Overlay, TermSheetPatch, overlay};

/// Pure merge: returns the merged document and leaves the input untouched.
///
/// ```rust
/// use dealmemo_document::{Document, DocumentPatch, merge};
///
/// let doc = Document::new();
/// let patch: DocumentPatch = serde_json::from_str(r#"{"companyOverview":"X"}"#).unwrap();
/// let merged = merge(&doc, &patch);
/// assert_eq!(merged.company_overview, "X");
/// assert_eq!(merge(&merged, &patch), merged);
/// ```
#[must_use]
pub fn merge(document: &Document, patch: &DocumentPatch) -> Document {
    let mut next = document.clone();
    next.overlay_patch(patch.clone());
    next
}

/// Collapse scenarios sharing a case name: the last occurrence's values win,
/// at the position of the first occurrence.
#[must_use]
pub fn dedupe_scenarios(scenarios: Vec<Scenario>) -> Vec<Scenario> {
    let mut out: Vec<Scenario> = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let key = scenario_key(&scenario.name);
        match out.iter_mut().find(|s| scenario_key(&s.name) == key) {
            Some(existing) => *existing = scenario,
            None => out.push(scenario),
        }
    }
    out
}

impl Overlay for Document {
    type Patch = DocumentPatch;

    fn overlay_patch(&mut self, patch: DocumentPatch) {
        overlay(&mut self.title, patch.title);
        overlay(&mut self.status, patch.status);
        overlay(&mut self.last_updated, patch.last_updated.map(Some));
        overlay(&mut self.company_overview, patch.company_overview);
        overlay(&mut self.industry_analysis, patch.industry_analysis);
        overlay(&mut self.executive_summary, patch.executive_summary);
        overlay(&mut self.investment_thesis, patch.investment_thesis);
        overlay(&mut self.key_highlights, patch.key_highlights);
        overlay(&mut self.recommendation, patch.recommendation);
        if let Some(term_sheet) = patch.term_sheet {
            self.term_sheet.overlay_patch(term_sheet);
        }
        overlay(&mut self.capital_structure, patch.capital_structure);
        overlay(&mut self.risks, patch.risks);
        overlay(&mut self.scenarios, patch.scenarios.map(dedupe_scenarios));
        overlay(&mut self.waterfall, patch.waterfall);
        if let Some(model) = patch.financial_model {
            self.financial_model.overlay_patch(model);
        }
    }
}

impl Overlay for TermSheet {
    type Patch = TermSheetPatch;

    fn overlay_patch(&mut self, patch: TermSheetPatch) {
        overlay(&mut self.borrower, patch.borrower);
        overlay(&mut self.facility_type, patch.facility_type);
        overlay(&mut self.amount, patch.amount.map(Some));
        overlay(&mut self.currency, patch.currency);
        overlay(&mut self.tenor, patch.tenor);
        overlay(&mut self.benchmark, patch.benchmark);
        overlay(&mut self.margin, patch.margin);
        overlay(&mut self.floor, patch.floor);
        overlay(&mut self.all_in_rate, patch.all_in_rate);
        overlay(&mut self.repayment_type, patch.repayment_type);
        overlay(&mut self.fees, patch.fees);
        overlay(&mut self.amortization, patch.amortization);
        overlay(&mut self.covenants, patch.covenants);
        overlay(&mut self.conditions_precedent, patch.conditions_precedent);
        overlay(&mut self.reporting_requirements, patch.reporting_requirements);
    }
}

impl Overlay for FinancialModel {
    type Patch = FinancialModelPatch;

    fn overlay_patch(&mut self, patch: FinancialModelPatch) {
        overlay(&mut self.currency, patch.currency);
        overlay(&mut self.units, patch.units);
        overlay(&mut self.sheets, patch.sheets);
    }
}

impl Document {
    /// Merge a patch in place.
    pub fn apply(&mut self, patch: DocumentPatch) {
        self.overlay_patch(patch);
    }

    /// The patch that re-applies every present value of this document.
    ///
    /// Blank values and empty lists merge as absent, and scenarios are
    /// de-duplicated, so this is not an exact copy for every document.
    #[must_use]
    pub fn to_patch(&self) -> DocumentPatch {
        let ts = &self.term_sheet;
        DocumentPatch {
            title: Some(self.title.clone()),
            status: Some(self.status),
            last_updated: self.last_updated,
            company_overview: Some(self.company_overview.clone()),
            industry_analysis: Some(self.industry_analysis.clone()),
            executive_summary: Some(self.executive_summary.clone()),
            investment_thesis: Some(self.investment_thesis.clone()),
            key_highlights: Some(self.key_highlights.clone()),
            recommendation: Some(self.recommendation.clone()),
            term_sheet: Some(TermSheetPatch {
                borrower: Some(ts.borrower.clone()),
                facility_type: Some(ts.facility_type.clone()),
                amount: ts.amount,
                currency: Some(ts.currency.clone()),
                tenor: Some(ts.tenor.clone()),
                benchmark: Some(ts.benchmark.clone()),
                margin: Some(ts.margin.clone()),
                floor: Some(ts.floor.clone()),
                all_in_rate: Some(ts.all_in_rate.clone()),
                repayment_type: Some(ts.repayment_type.clone()),
                fees: Some(ts.fees.clone()),
                amortization: Some(ts.amortization.clone()),
                covenants: Some(ts.covenants.clone()),
                conditions_precedent: Some(ts.conditions_precedent.clone()),
                reporting_requirements: Some(ts.reporting_requirements.clone()),
            }),
            capital_structure: Some(self.capital_structure.clone()),
            risks: Some(self.risks.clone()),
            scenarios: Some(self.scenarios.clone()),
            waterfall: Some(self.waterfall.clone()),
            financial_model: Some(FinancialModelPatch {
                currency: Some(self.financial_model.currency.clone()),
                units: Some(self.financial_model.units.clone()),
                sheets: Some(self.financial_model.sheets.clone()),
            }),
        }
    }

    /// Start a run from a previously accumulated document.
    ///
    /// The seed is taken as-is, including empty lists and repeated scenario
    /// names; phases then overwrite only what they regenerate.
    #[must_use]
    pub fn seeded_from(previous: &Document) -> Document {
        previous.clone()
    }
}

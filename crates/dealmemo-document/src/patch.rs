//! Partial document updates and the presence rule that governs merging.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::lenient;
use crate::model::{
    AmortizationTranche, Covenant, Fee, Instrument, MemoStatus, Narrative, Risk, Scenario, Sheet,
    WaterfallLayer,
};

/// Whether a value counts as "present and non-empty" for merging.
///
/// Strings must be non-blank, collections non-empty, numbers finite.
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Presence for f64 {
    fn is_present(&self) -> bool {
        self.is_finite()
    }
}

impl Presence for Narrative {
    fn is_present(&self) -> bool {
        self.has_content()
    }
}

impl Presence for MemoStatus {
    fn is_present(&self) -> bool {
        true
    }
}

impl Presence for NaiveDate {
    fn is_present(&self) -> bool {
        true
    }
}

impl<T: Presence> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.as_ref().is_some_and(Presence::is_present)
    }
}

/// The merge rule for one field: take `incoming` when it is present and
/// non-empty, otherwise keep `current`.
///
/// Returns whether `current` was replaced.
///
/// ```rust
/// use dealmemo_document::patch::overlay;
///
/// let mut title = String::from("Acme Corp");
/// assert!(!overlay(&mut title, Some("   ".to_string())));
/// assert!(!overlay(&mut title, None));
/// assert!(overlay(&mut title, Some("Acme Corp TLB".to_string())));
/// assert_eq!(title, "Acme Corp TLB");
/// ```
pub fn overlay<T: Presence>(current: &mut T, incoming: Option<T>) -> bool {
    match incoming {
        Some(value) if value.is_present() => {
            *current = value;
            true
        }
        _ => false,
    }
}

/// A record that accepts a patch of itself field by field.
pub trait Overlay {
    type Patch;

    fn overlay_patch(&mut self, patch: Self::Patch);
}

/// Every mergeable field path of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum PatchField {
    Title,
    Status,
    LastUpdated,
    CompanyOverview,
    IndustryAnalysis,
    ExecutiveSummary,
    InvestmentThesis,
    KeyHighlights,
    Recommendation,
    CapitalStructure,
    Risks,
    Scenarios,
    Waterfall,
    FinancialModel,
    TermBorrower,
    TermFacilityType,
    TermAmount,
    TermCurrency,
    TermTenor,
    TermBenchmark,
    TermMargin,
    TermFloor,
    TermAllInRate,
    TermRepaymentType,
    TermFees,
    TermAmortization,
    TermCovenants,
    TermConditionsPrecedent,
    TermReportingRequirements,
}

impl PatchField {
    /// JSON path of the field, e.g. `termSheet.borrower`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Status => "status",
            Self::LastUpdated => "lastUpdated",
            Self::CompanyOverview => "companyOverview",
            Self::IndustryAnalysis => "industryAnalysis",
            Self::ExecutiveSummary => "executiveSummary",
            Self::InvestmentThesis => "investmentThesis",
            Self::KeyHighlights => "keyHighlights",
            Self::Recommendation => "recommendation",
            Self::CapitalStructure => "capitalStructure",
            Self::Risks => "risks",
            Self::Scenarios => "scenarios",
            Self::Waterfall => "waterfall",
            Self::FinancialModel => "financialModel",
            Self::TermBorrower => "termSheet.borrower",
            Self::TermFacilityType => "termSheet.facilityType",
            Self::TermAmount => "termSheet.amount",
            Self::TermCurrency => "termSheet.currency",
            Self::TermTenor => "termSheet.tenor",
            Self::TermBenchmark => "termSheet.benchmark",
            Self::TermMargin => "termSheet.margin",
            Self::TermFloor => "termSheet.floor",
            Self::TermAllInRate => "termSheet.allInRate",
            Self::TermRepaymentType => "termSheet.repaymentType",
            Self::TermFees => "termSheet.fees",
            Self::TermAmortization => "termSheet.amortization",
            Self::TermCovenants => "termSheet.covenants",
            Self::TermConditionsPrecedent => "termSheet.conditionsPrecedent",
            Self::TermReportingRequirements => "termSheet.reportingRequirements",
        }
    }

    /// Whether this path lives inside the term sheet.
    #[must_use]
    pub fn is_term_sheet(&self) -> bool {
        self.as_str().starts_with("termSheet.")
    }

    /// All term-sheet paths.
    pub fn term_sheet_fields() -> impl Iterator<Item = PatchField> {
        PatchField::iter().filter(PatchField::is_term_sheet)
    }
}

impl std::fmt::Display for PatchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update of a [`crate::TermSheet`]; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TermSheetPatch {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub borrower: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub facility_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub tenor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub benchmark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub margin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub floor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub all_in_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub repayment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_records")]
    pub fees: Option<Vec<Fee>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_records")]
    pub amortization: Option<Vec<AmortizationTranche>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_records")]
    pub covenants: Option<Vec<Covenant>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string_list"
    )]
    pub conditions_precedent: Option<Vec<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string_list"
    )]
    pub reporting_requirements: Option<Vec<String>>,
}

impl TermSheetPatch {
    /// Whether no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    /// Term-sheet paths whose key is set, in declaration order.
    #[must_use]
    pub fn present_fields(&self) -> Vec<PatchField> {
        let flags = [
            (PatchField::TermBorrower, self.borrower.is_some()),
            (PatchField::TermFacilityType, self.facility_type.is_some()),
            (PatchField::TermAmount, self.amount.is_some()),
            (PatchField::TermCurrency, self.currency.is_some()),
            (PatchField::TermTenor, self.tenor.is_some()),
            (PatchField::TermBenchmark, self.benchmark.is_some()),
            (PatchField::TermMargin, self.margin.is_some()),
            (PatchField::TermFloor, self.floor.is_some()),
            (PatchField::TermAllInRate, self.all_in_rate.is_some()),
            (PatchField::TermRepaymentType, self.repayment_type.is_some()),
            (PatchField::TermFees, self.fees.is_some()),
            (PatchField::TermAmortization, self.amortization.is_some()),
            (PatchField::TermCovenants, self.covenants.is_some()),
            (
                PatchField::TermConditionsPrecedent,
                self.conditions_precedent.is_some(),
            ),
            (
                PatchField::TermReportingRequirements,
                self.reporting_requirements.is_some(),
            ),
        ];
        flags
            .into_iter()
            .filter_map(|(field, set)| set.then_some(field))
            .collect()
    }

    fn clear(&mut self, field: PatchField) {
        match field {
            PatchField::TermBorrower => self.borrower = None,
            PatchField::TermFacilityType => self.facility_type = None,
            PatchField::TermAmount => self.amount = None,
            PatchField::TermCurrency => self.currency = None,
            PatchField::TermTenor => self.tenor = None,
            PatchField::TermBenchmark => self.benchmark = None,
            PatchField::TermMargin => self.margin = None,
            PatchField::TermFloor => self.floor = None,
            PatchField::TermAllInRate => self.all_in_rate = None,
            PatchField::TermRepaymentType => self.repayment_type = None,
            PatchField::TermFees => self.fees = None,
            PatchField::TermAmortization => self.amortization = None,
            PatchField::TermCovenants => self.covenants = None,
            PatchField::TermConditionsPrecedent => self.conditions_precedent = None,
            PatchField::TermReportingRequirements => self.reporting_requirements = None,
            _ => {}
        }
    }
}

/// Partial update of a [`crate::FinancialModel`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialModelPatch {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_records")]
    pub sheets: Option<Vec<Sheet>>,
}

/// A partial document produced by one phase. Absent keys leave the
/// document untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_enum")]
    pub status: Option<MemoStatus>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_date")]
    pub last_updated: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub company_overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub industry_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<Narrative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investment_thesis: Option<Narrative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_highlights: Option<Narrative>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub recommendation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_sheet: Option<TermSheetPatch>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_records")]
    pub capital_structure: Option<Vec<Instrument>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_records")]
    pub risks: Option<Vec<Risk>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_records")]
    pub scenarios: Option<Vec<Scenario>>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_records")]
    pub waterfall: Option<Vec<WaterfallLayer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_model: Option<FinancialModelPatch>,
}

impl DocumentPatch {
    /// The patch that changes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    /// Paths whose key is set (value may still be blank).
    ///
    /// Term-sheet keys are reported individually; the financial model is a
    /// single path.
    #[must_use]
    pub fn present_fields(&self) -> Vec<PatchField> {
        let flags = [
            (PatchField::Title, self.title.is_some()),
            (PatchField::Status, self.status.is_some()),
            (PatchField::LastUpdated, self.last_updated.is_some()),
            (PatchField::CompanyOverview, self.company_overview.is_some()),
            (PatchField::IndustryAnalysis, self.industry_analysis.is_some()),
            (PatchField::ExecutiveSummary, self.executive_summary.is_some()),
            (PatchField::InvestmentThesis, self.investment_thesis.is_some()),
            (PatchField::KeyHighlights, self.key_highlights.is_some()),
            (PatchField::Recommendation, self.recommendation.is_some()),
            (PatchField::CapitalStructure, self.capital_structure.is_some()),
            (PatchField::Risks, self.risks.is_some()),
            (PatchField::Scenarios, self.scenarios.is_some()),
            (PatchField::Waterfall, self.waterfall.is_some()),
            (PatchField::FinancialModel, self.financial_model.is_some()),
        ];
        let mut fields: Vec<PatchField> = flags
            .into_iter()
            .filter_map(|(field, set)| set.then_some(field))
            .collect();
        if let Some(term_sheet) = &self.term_sheet {
            fields.extend(term_sheet.present_fields());
        }
        fields
    }

    /// Keep only the listed paths; returns the paths that were dropped.
    ///
    /// A term sheet left with no keys is removed entirely.
    pub fn retain_fields(&mut self, allowed: &[PatchField]) -> Vec<PatchField> {
        let dropped: Vec<PatchField> = self
            .present_fields()
            .into_iter()
            .filter(|field| !allowed.contains(field))
            .collect();

        for field in &dropped {
            match field {
                PatchField::Title => self.title = None,
                PatchField::Status => self.status = None,
                PatchField::LastUpdated => self.last_updated = None,
                PatchField::CompanyOverview => self.company_overview = None,
                PatchField::IndustryAnalysis => self.industry_analysis = None,
                PatchField::ExecutiveSummary => self.executive_summary = None,
                PatchField::InvestmentThesis => self.investment_thesis = None,
                PatchField::KeyHighlights => self.key_highlights = None,
                PatchField::Recommendation => self.recommendation = None,
                PatchField::CapitalStructure => self.capital_structure = None,
                PatchField::Risks => self.risks = None,
                PatchField::Scenarios => self.scenarios = None,
                PatchField::Waterfall => self.waterfall = None,
                PatchField::FinancialModel => self.financial_model = None,
                term_field => {
                    if let Some(term_sheet) = self.term_sheet.as_mut() {
                        term_sheet.clear(*term_field);
                    }
                }
            }
        }

        if self.term_sheet.as_ref().is_some_and(TermSheetPatch::is_empty) {
            self.term_sheet = None;
        }

        dropped
    }
}

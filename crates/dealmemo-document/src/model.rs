//! The memorandum aggregate and its sub-records.
//!
//! JSON field names are camelCase. Every record deserializes leniently
//! (see [`crate::lenient`]) because documents come back from generation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::lenient::{self, lenient_enum};

/// Lifecycle status of a memorandum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum MemoStatus {
    #[default]
    Draft,
    #[strum(serialize = "Review", serialize = "in review", serialize = "in_review")]
    Review,
    #[strum(serialize = "Approved", serialize = "final")]
    Approved,
}
lenient_enum!(MemoStatus);

/// Three-valued rating used across the risk register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Level {
    Low,
    #[default]
    #[strum(serialize = "Medium", serialize = "med", serialize = "moderate")]
    Medium,
    High,
}
lenient_enum!(Level);

/// Covenant family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum CovenantKind {
    /// Tested periodically against a financial threshold.
    #[default]
    #[strum(serialize = "Maintenance", serialize = "financial")]
    Maintenance,
    /// Restricts an action (additional debt, asset sales, distributions).
    #[strum(serialize = "Negative", serialize = "incurrence")]
    Negative,
}
lenient_enum!(CovenantKind);

/// Free text or an ordered list of points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Narrative {
    Text(String),
    Points(Vec<String>),
}

impl<'de> Deserialize<'de> for Narrative {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        use serde_json::Value;
        Ok(match Option::<Value>::deserialize(d)? {
            Some(list @ Value::Array(_)) => {
                let points = lenient::string_list(list).map_err(serde::de::Error::custom)?;
                Narrative::Points(points)
            }
            other => {
                let text = lenient::string(other.unwrap_or(Value::Null))
                    .map_err(serde::de::Error::custom)?;
                Narrative::Text(text)
            }
        })
    }
}

impl Default for Narrative {
    fn default() -> Self {
        Narrative::Text(String::new())
    }
}

impl Narrative {
    /// Whether the narrative carries any non-blank content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        match self {
            Narrative::Text(text) => !text.trim().is_empty(),
            Narrative::Points(points) => points.iter().any(|p| !p.trim().is_empty()),
        }
    }
}

/// The evolving credit memorandum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    pub status: MemoStatus,
    #[serde(deserialize_with = "lenient::opt_date")]
    pub last_updated: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::string")]
    pub company_overview: String,
    #[serde(deserialize_with = "lenient::string")]
    pub industry_analysis: String,
    pub executive_summary: Narrative,
    pub investment_thesis: Narrative,
    pub key_highlights: Narrative,
    #[serde(deserialize_with = "lenient::string")]
    pub recommendation: String,
    pub term_sheet: TermSheet,
    #[serde(deserialize_with = "lenient::records")]
    pub capital_structure: Vec<Instrument>,
    #[serde(deserialize_with = "lenient::records")]
    pub risks: Vec<Risk>,
    #[serde(deserialize_with = "lenient::records")]
    pub scenarios: Vec<Scenario>,
    #[serde(deserialize_with = "lenient::records")]
    pub waterfall: Vec<WaterfallLayer>,
    pub financial_model: FinancialModel,
}

impl Document {
    /// An empty draft: blank strings, empty collections, status `Draft`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a scenario by case name (trimmed, case-insensitive).
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        let key = scenario_key(name);
        self.scenarios.iter().find(|s| scenario_key(&s.name) == key)
    }
}

pub(crate) fn scenario_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Facility terms assembled by Deal Structuring and Covenant Design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TermSheet {
    #[serde(deserialize_with = "lenient::string")]
    pub borrower: String,
    #[serde(deserialize_with = "lenient::string")]
    pub facility_type: String,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
    #[serde(deserialize_with = "lenient::string")]
    pub currency: String,
    #[serde(deserialize_with = "lenient::string")]
    pub tenor: String,
    #[serde(deserialize_with = "lenient::string")]
    pub benchmark: String,
    #[serde(deserialize_with = "lenient::string")]
    pub margin: String,
    #[serde(deserialize_with = "lenient::string")]
    pub floor: String,
    #[serde(deserialize_with = "lenient::string")]
    pub all_in_rate: String,
    #[serde(deserialize_with = "lenient::string")]
    pub repayment_type: String,
    #[serde(deserialize_with = "lenient::records")]
    pub fees: Vec<Fee>,
    #[serde(deserialize_with = "lenient::records")]
    pub amortization: Vec<AmortizationTranche>,
    #[serde(deserialize_with = "lenient::records")]
    pub covenants: Vec<Covenant>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub conditions_precedent: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub reporting_requirements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fee {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
    /// How `amount` is expressed, e.g. "% of commitment" or "USD".
    #[serde(deserialize_with = "lenient::string")]
    pub basis: String,
    #[serde(deserialize_with = "lenient::string")]
    pub timing: String,
}

/// One scheduled repayment. Stored as generated; no schedule is computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmortizationTranche {
    #[serde(deserialize_with = "lenient::string")]
    pub period: String,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub percentage: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Covenant {
    #[serde(alias = "type")]
    pub kind: CovenantKind,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub threshold: String,
    #[serde(deserialize_with = "lenient::string")]
    pub test_frequency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instrument {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(alias = "type", deserialize_with = "lenient::string")]
    pub instrument_type: String,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub amount: Option<f64>,
    #[serde(deserialize_with = "lenient::string")]
    pub pricing: String,
    #[serde(deserialize_with = "lenient::string")]
    pub maturity: String,
    #[serde(deserialize_with = "lenient::string")]
    pub seniority: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Risk {
    #[serde(deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(alias = "mitigation", deserialize_with = "lenient::string")]
    pub mitigant: String,
    pub impact: Level,
    pub probability: Level,
    pub velocity: Level,
    pub residual_risk: Level,
}

/// A named return case (`Base Case`, `Upside Case`, `Downside Case`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    #[serde(alias = "case", deserialize_with = "lenient::string")]
    pub name: String,
    /// Percent, as written (`25` for 25%).
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub probability: Option<f64>,
    /// Percent, as written.
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub irr: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub moic: Option<f64>,
}

/// One layer of the liquidation waterfall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaterfallLayer {
    #[serde(deserialize_with = "lenient::opt_u32")]
    pub priority: Option<u32>,
    #[serde(alias = "name", deserialize_with = "lenient::string")]
    pub claimant: String,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub claim: Option<f64>,
    /// Percent of claim recovered.
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub recovery: Option<f64>,
}

/// Projections produced by Financial Modeling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialModel {
    #[serde(deserialize_with = "lenient::string")]
    pub currency: String,
    /// e.g. "USD millions"
    #[serde(deserialize_with = "lenient::string")]
    pub units: String,
    #[serde(deserialize_with = "lenient::records")]
    pub sheets: Vec<Sheet>,
}

impl FinancialModel {
    /// Find a row by its stable identifier across all sheets.
    #[must_use]
    pub fn row(&self, id: &str) -> Option<(&Sheet, &Row)> {
        self.sheets
            .iter()
            .find_map(|sheet| sheet.row(id).map(|row| (sheet, row)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColumnKind {
    #[default]
    Number,
    Currency,
    Percent,
    Text,
}
lenient_enum!(ColumnKind);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RowKind {
    Header,
    #[default]
    Input,
    Formula,
    Total,
}
lenient_enum!(RowKind);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub label: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Row {
    /// Stable identifier (`revenue`, `ebitda`, `total_debt`, ...)
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub label: String,
    pub kind: RowKind,
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sheet {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::records")]
    pub columns: Vec<Column>,
    #[serde(deserialize_with = "lenient::records")]
    pub rows: Vec<Row>,
}

impl Sheet {
    #[must_use]
    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }
}

/// A spreadsheet cell: a number, text, or nothing.
///
/// Numeric-looking strings (`"1,250"`, `"12%"`) deserialize as numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        use serde_json::Value;
        Ok(match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => CellValue::Empty,
            Some(Value::Number(n)) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
            Some(Value::String(s)) => match lenient::parse_number(&s) {
                Some(n) => CellValue::Number(n),
                None if s.trim().is_empty() => CellValue::Empty,
                None => CellValue::Text(s),
            },
            Some(Value::Bool(b)) => CellValue::Text(b.to_string()),
            Some(other) => CellValue::Text(other.to_string()),
        })
    }
}

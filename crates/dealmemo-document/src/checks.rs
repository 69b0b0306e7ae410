//! Consistency checks over the financial model.
//!
//! Rows are addressed by their stable `id`, never by label text.

use serde::Serialize;

use crate::model::{CellValue, FinancialModel, RowKind};

/// Row ids the checks rely on.
pub const REVENUE_ROW: &str = "revenue";
pub const EBITDA_ROW: &str = "ebitda";
pub const TOTAL_DEBT_ROW: &str = "total_debt";

const REQUIRED_ROWS: [&str; 3] = [REVENUE_ROW, EBITDA_ROW, TOTAL_DEBT_ROW];

/// A finding about the financial model. Findings are advisory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModelIssue {
    /// A required row id is absent from every sheet.
    MissingRow { row: String },
    /// A data row holds text where a number was expected.
    NonNumericCell {
        sheet: String,
        row: String,
        column: usize,
        value: String,
    },
    /// EBITDA above revenue in the same column.
    EbitdaExceedsRevenue {
        column: usize,
        ebitda: f64,
        revenue: f64,
    },
}

impl std::fmt::Display for ModelIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRow { row } => write!(f, "row '{row}' not found"),
            Self::NonNumericCell {
                sheet,
                row,
                column,
                value,
            } => write!(
                f,
                "{sheet}/{row} column {column} is not numeric: '{value}'"
            ),
            Self::EbitdaExceedsRevenue {
                column,
                ebitda,
                revenue,
            } => write!(
                f,
                "EBITDA {ebitda} exceeds revenue {revenue} in column {column}"
            ),
        }
    }
}

/// Run every check. An empty model yields no findings.
#[must_use]
pub fn check_model(model: &FinancialModel) -> Vec<ModelIssue> {
    if model.sheets.is_empty() {
        return Vec::new();
    }

    let mut issues = Vec::new();

    for id in REQUIRED_ROWS {
        if model.row(id).is_none() {
            issues.push(ModelIssue::MissingRow { row: id.to_string() });
        }
    }

    for sheet in &model.sheets {
        for row in sheet.rows.iter().filter(|r| r.kind != RowKind::Header) {
            for (column, cell) in row.cells.iter().enumerate() {
                // The first column commonly carries the row's own caption.
                if column == 0 {
                    continue;
                }
                if let CellValue::Text(value) = cell {
                    issues.push(ModelIssue::NonNumericCell {
                        sheet: sheet.name.clone(),
                        row: row.id.clone(),
                        column,
                        value: value.clone(),
                    });
                }
            }
        }
    }

    if let (Some((_, revenue)), Some((_, ebitda))) =
        (model.row(REVENUE_ROW), model.row(EBITDA_ROW))
    {
        for (column, (rev, ebit)) in revenue.cells.iter().zip(&ebitda.cells).enumerate() {
            if let (Some(revenue), Some(ebitda)) = (rev.as_number(), ebit.as_number())
                && ebitda > revenue
            {
                issues.push(ModelIssue::EbitdaExceedsRevenue {
                    column,
                    ebitda,
                    revenue,
                });
            }
        }
    }

    issues
}

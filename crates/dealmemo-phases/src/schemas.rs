//! Built-in output schemas, one JSON shape description per phase.

use std::borrow::Cow;

use dealmemo_phase_api::{PhaseId, SchemaLibrary};

/// The schema library compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSchemas;

impl SchemaLibrary for BuiltinSchemas {
    fn schema(&self, phase: PhaseId) -> Cow<'_, str> {
        Cow::Borrowed(match phase {
            PhaseId::DataCollection => DATA_COLLECTION,
            PhaseId::FinancialModeling => FINANCIAL_MODELING,
            PhaseId::RiskAssessment => RISK_ASSESSMENT,
            PhaseId::DealStructuring => DEAL_STRUCTURING,
            PhaseId::CovenantDesign => COVENANT_DESIGN,
            PhaseId::Writing => WRITING,
        })
    }
}

const DATA_COLLECTION: &str = r#"{
  "title": "string, memorandum title naming the borrower and facility",
  "companyOverview": "string, business description, ownership, history, scale",
  "industryAnalysis": "string, market size, growth, competitive position, cyclicality"
}"#;

const FINANCIAL_MODELING: &str = r#"{
  "financialModel": {
    "currency": "ISO code, e.g. USD",
    "units": "e.g. millions",
    "sheets": [{
      "name": "string",
      "columns": [{ "id": "string", "label": "string", "kind": "number | currency | percent | text" }],
      "rows": [{
        "id": "stable identifier; use revenue, ebitda, total_debt for those lines",
        "label": "string",
        "kind": "header | input | formula | total",
        "cells": ["first cell is the row label, then one value per remaining column"]
      }]
    }]
  },
  "scenarios": [
    { "name": "Base Case | Upside Case | Downside Case", "probability": "number, percent", "irr": "number, percent", "moic": "number, multiple" }
  ]
}"#;

const RISK_ASSESSMENT: &str = r#"{
  "risks": [{
    "category": "string",
    "description": "string",
    "mitigant": "string",
    "impact": "Low | Medium | High",
    "probability": "Low | Medium | High",
    "velocity": "Low | Medium | High",
    "residualRisk": "Low | Medium | High"
  }],
  "waterfall": [
    { "priority": "integer, 1 is paid first", "claimant": "string", "claim": "number", "recovery": "number, percent" }
  ]
}"#;

const DEAL_STRUCTURING: &str = r#"{
  "termSheet": {
    "borrower": "string",
    "facilityType": "string, e.g. Senior Secured Term Loan B",
    "amount": "number",
    "currency": "ISO code",
    "tenor": "string, e.g. 5 years",
    "benchmark": "string, e.g. SOFR",
    "margin": "string, e.g. S+475",
    "floor": "string",
    "allInRate": "string",
    "repaymentType": "string, e.g. amortizing or bullet",
    "fees": [{ "name": "string", "amount": "number", "basis": "string", "timing": "string" }],
    "amortization": [{ "period": "string", "percentage": "number", "amount": "number" }]
  },
  "capitalStructure": [
    { "name": "string", "type": "string", "amount": "number", "pricing": "string", "maturity": "string", "seniority": "string" }
  ]
}"#;

const COVENANT_DESIGN: &str = r#"{
  "termSheet": {
    "covenants": [
      { "kind": "Maintenance | Negative", "name": "string", "threshold": "string", "testFrequency": "string" }
    ],
    "conditionsPrecedent": ["string"],
    "reportingRequirements": ["string"]
  }
}"#;

const WRITING: &str = r#"{
  "executiveSummary": "string or array of strings",
  "investmentThesis": ["string"],
  "keyHighlights": ["string"],
  "recommendation": "string, approve / decline with conditions",
  "status": "Draft | Review | Approved",
  "termSheet": "optional; only term sheet keys you are correcting, same shape as before"
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_phase_has_a_json_schema() {
        for phase in PhaseId::ALL {
            let schema = BuiltinSchemas.schema(phase);
            let value: serde_json::Value = serde_json::from_str(&schema)
                .unwrap_or_else(|e| panic!("{phase} schema is not JSON: {e}"));
            assert!(value.is_object(), "{phase}");
        }
    }

    #[test]
    fn test_schemas_name_owned_keys() {
        assert!(BuiltinSchemas.schema(PhaseId::FinancialModeling).contains("\"scenarios\""));
        assert!(BuiltinSchemas.schema(PhaseId::CovenantDesign).contains("\"covenants\""));
        assert!(!BuiltinSchemas.schema(PhaseId::CovenantDesign).contains("\"borrower\""));
    }
}

//! Property-based tests for the document merge rule
//!
//! Patches are generated as JSON objects, the same shape a phase answers
//! with, then parsed and merged. Seed documents are parsed from the same
//! shape, so they may carry empty lists and repeated scenario names the way
//! a hand-edited `--document` file can.
//!
//! ## Configuration
//!
//! - `PROPTEST_CASES`: Number of test cases per property (default: 64)
//!
//! ```bash
//! PROPTEST_CASES=256 cargo test --test property_based_tests
//! ```

use dealmemo::{Document, DocumentPatch, merge};
use dealmemo::document::Presence;
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(64);
    ProptestConfig::with_cases(cases)
}

/// Text that is sometimes blank, so the keep-existing branch is exercised.
fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just(String::new()),
        1 => Just("   ".to_string()),
        4 => "[A-Za-z][A-Za-z0-9 ,.]{0,24}",
    ]
}

fn scenario_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Base Case".to_string()),
        Just("base case".to_string()),
        Just("Upside Case".to_string()),
        Just("Downside Case".to_string()),
    ]
}

/// A narrative as a phase writes it: prose, or a list of points that may
/// be empty or hold only blanks.
fn narrative() -> impl Strategy<Value = Value> {
    prop_oneof![
        text().prop_map(Value::String),
        proptest::collection::vec(text(), 0..3)
            .prop_map(|points| Value::Array(points.into_iter().map(Value::String).collect())),
    ]
}

fn status() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("Draft")),
        Just(json!("Review")),
        Just(json!("in review")),
        Just(json!("Approved")),
        Just(json!("pending")),
    ]
}

fn scenarios() -> impl Strategy<Value = Value> {
    proptest::collection::vec((scenario_name(), proptest::option::of(0.0f64..100.0)), 0..4)
        .prop_map(|rows| {
            Value::Array(
                rows.into_iter()
                    .map(|(name, irr)| json!({ "name": name, "irr": irr }))
                    .collect(),
            )
        })
}

fn risks() -> impl Strategy<Value = Value> {
    proptest::collection::vec((text(), text()), 0..3).prop_map(|rows| {
        Value::Array(
            rows.into_iter()
                .map(|(category, description)| {
                    json!({ "category": category, "description": description })
                })
                .collect(),
        )
    })
}

fn waterfall() -> impl Strategy<Value = Value> {
    proptest::collection::vec((text(), 1u32..6), 0..3).prop_map(|rows| {
        Value::Array(
            rows.into_iter()
                .map(|(claimant, priority)| json!({ "claimant": claimant, "priority": priority }))
                .collect(),
        )
    })
}

/// Insert each `Some` value under its key.
fn object(entries: Vec<(&str, Option<Value>)>) -> Value {
    let obj: Map<String, Value> = entries
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect();
    Value::Object(obj)
}

/// A nested term-sheet patch: pricing strings, an amount and covenants.
fn term_sheet() -> impl Strategy<Value = Value> {
    (
        proptest::option::of(text()),
        proptest::option::of(text()),
        proptest::option::of(0.0f64..1.0e9),
        proptest::option::of(proptest::collection::vec(text(), 0..3)),
    )
        .prop_map(|(borrower, margin, amount, covenants)| {
            object(vec![
                ("borrower", borrower.map(Value::String)),
                ("margin", margin.map(Value::String)),
                ("amount", amount.map(|a| json!(a))),
                (
                    "covenants",
                    covenants.map(|names| {
                        Value::Array(
                            names
                                .into_iter()
                                .map(|name| json!({ "kind": "Maintenance", "name": name }))
                                .collect(),
                        )
                    }),
                ),
            ])
        })
}

fn financial_model() -> impl Strategy<Value = Value> {
    (proptest::option::of(text()), proptest::option::of(text())).prop_map(|(currency, units)| {
        object(vec![
            ("currency", currency.map(Value::String)),
            ("units", units.map(Value::String)),
        ])
    })
}

/// A phase-style answer: any subset of top-level, nested and list fields.
fn patch_json() -> impl Strategy<Value = Value> {
    (
        (
            proptest::option::of(text()),
            proptest::option::of(status()),
            proptest::option::of(text()),
            proptest::option::of(text()),
            proptest::option::of(narrative()),
            proptest::option::of(text()),
        ),
        (
            proptest::option::of(term_sheet()),
            proptest::option::of(financial_model()),
            proptest::option::of(scenarios()),
            proptest::option::of(risks()),
            proptest::option::of(waterfall()),
        ),
    )
        .prop_map(
            |(
                (title, status, overview, industry, summary, recommendation),
                (term_sheet, model, scenarios, risks, waterfall),
            )| {
                object(vec![
                    ("title", title.map(Value::String)),
                    ("status", status),
                    ("companyOverview", overview.map(Value::String)),
                    ("industryAnalysis", industry.map(Value::String)),
                    ("executiveSummary", summary),
                    ("recommendation", recommendation.map(Value::String)),
                    ("termSheet", term_sheet),
                    ("financialModel", model),
                    ("scenarios", scenarios),
                    ("risks", risks),
                    ("waterfall", waterfall),
                ])
            },
        )
}

fn patch() -> impl Strategy<Value = DocumentPatch> {
    patch_json().prop_map(|v| serde_json::from_value(v).expect("generated patch parses"))
}

/// A document loaded as-is from JSON; scenarios are not deduplicated.
fn seed_document() -> impl Strategy<Value = Document> {
    patch_json().prop_map(|v| serde_json::from_value(v).expect("generated document parses"))
}

/// A raw seed followed by a few merged phase answers.
fn document() -> impl Strategy<Value = Document> {
    (seed_document(), proptest::collection::vec(patch(), 0..3)).prop_map(|(seed, patches)| {
        patches.iter().fold(seed, |doc, p| merge(&doc, p))
    })
}

/// Expected value of one field after merging: the incoming value when it
/// is present, the current one otherwise.
fn merged_value<T: Presence + Clone>(current: &T, incoming: Option<&T>) -> T {
    match incoming {
        Some(value) if value.is_present() => value.clone(),
        _ => current.clone(),
    }
}

fn unique_scenario_names(doc: &Document) -> bool {
    let mut keys: Vec<String> = doc
        .scenarios
        .iter()
        .map(|s| s.name.trim().to_lowercase())
        .collect();
    let total = keys.len();
    keys.sort();
    keys.dedup();
    keys.len() == total
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn prop_empty_patch_is_identity(doc in document()) {
        prop_assert_eq!(merge(&doc, &DocumentPatch::default()), doc);
    }

    #[test]
    fn prop_merge_is_idempotent(doc in document(), p in patch()) {
        let once = merge(&doc, &p);
        let twice = merge(&once, &p);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_blank_values_never_erase(doc in document(), p in patch()) {
        let merged = merge(&doc, &p);
        prop_assert_eq!(&merged.title, &merged_value(&doc.title, p.title.as_ref()));
        prop_assert_eq!(
            &merged.company_overview,
            &merged_value(&doc.company_overview, p.company_overview.as_ref())
        );
        prop_assert_eq!(
            &merged.executive_summary,
            &merged_value(&doc.executive_summary, p.executive_summary.as_ref())
        );
        prop_assert_eq!(
            &merged.recommendation,
            &merged_value(&doc.recommendation, p.recommendation.as_ref())
        );
        prop_assert_eq!(merged.status, p.status.unwrap_or(doc.status));
        prop_assert_eq!(&merged.risks, &merged_value(&doc.risks, p.risks.as_ref()));
        prop_assert_eq!(&merged.waterfall, &merged_value(&doc.waterfall, p.waterfall.as_ref()));
    }

    #[test]
    fn prop_nested_term_sheet_keeps_unpatched_terms(doc in document(), p in patch()) {
        let merged = merge(&doc, &p);
        let (ts, old) = (&merged.term_sheet, &doc.term_sheet);
        match &p.term_sheet {
            None => prop_assert_eq!(ts, old),
            Some(tp) => {
                prop_assert_eq!(&ts.borrower, &merged_value(&old.borrower, tp.borrower.as_ref()));
                prop_assert_eq!(&ts.margin, &merged_value(&old.margin, tp.margin.as_ref()));
                prop_assert_eq!(ts.amount, tp.amount.or(old.amount));
                prop_assert_eq!(&ts.covenants, &merged_value(&old.covenants, tp.covenants.as_ref()));
                prop_assert_eq!(&ts.facility_type, &old.facility_type);
                prop_assert_eq!(&ts.fees, &old.fees);
            }
        }
        let (fm, old) = (&merged.financial_model, &doc.financial_model);
        match &p.financial_model {
            None => prop_assert_eq!(fm, old),
            Some(mp) => {
                prop_assert_eq!(&fm.currency, &merged_value(&old.currency, mp.currency.as_ref()));
                prop_assert_eq!(&fm.units, &merged_value(&old.units, mp.units.as_ref()));
                prop_assert_eq!(&fm.sheets, &old.sheets);
            }
        }
    }

    #[test]
    fn prop_fields_outside_patch_are_untouched(doc in document(), p in patch()) {
        let merged = merge(&doc, &p);
        prop_assert_eq!(merged.last_updated, doc.last_updated);
        prop_assert_eq!(&merged.investment_thesis, &doc.investment_thesis);
        prop_assert_eq!(&merged.key_highlights, &doc.key_highlights);
        prop_assert_eq!(&merged.capital_structure, &doc.capital_structure);
        if p.scenarios.as_ref().is_none_or(Vec::is_empty) {
            prop_assert_eq!(&merged.scenarios, &doc.scenarios);
        }
        if p.industry_analysis.is_none() {
            prop_assert_eq!(&merged.industry_analysis, &doc.industry_analysis);
        }
    }

    #[test]
    fn prop_patched_scenario_names_are_unique(doc in document(), p in patch()) {
        let merged = merge(&doc, &p);
        if p.scenarios.as_ref().is_some_and(|rows| !rows.is_empty()) {
            prop_assert!(unique_scenario_names(&merged));
        }
    }

    #[test]
    fn prop_resume_preserves_accumulated_document(doc in document()) {
        prop_assert_eq!(Document::seeded_from(&doc), doc);
    }

    #[test]
    fn prop_resume_keeps_raw_seed(seed in seed_document()) {
        prop_assert_eq!(Document::seeded_from(&seed), seed);
    }
}

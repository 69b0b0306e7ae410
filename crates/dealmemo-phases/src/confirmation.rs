//! Prompt for the post-run confirmation message.

use dealmemo_document::Document;

use crate::context::ContextBuilder;

/// Shown to the requester when the confirmation call fails or returns nothing.
pub const FALLBACK_CONFIRMATION: &str =
    "The credit memorandum has been assembled from all six analysis phases and is ready for review.";

pub const CONFIRMATION_INSTRUCTIONS: &str = "\
You are the coordinator of a credit analysis team. The six-phase analysis \
(data collection, financial modeling, risk assessment, deal structuring, covenant \
design, writing) has finished. Summarize for the requester, in at most five plain \
sentences, what the memorandum now contains and the headline recommendation. \
Do not use JSON or markdown headings.";

/// User content for the confirmation call: the request plus the headline fields.
#[must_use]
pub fn confirmation_prompt(request: &str, document: &Document) -> String {
    let base_case = document.scenario("Base Case");
    ContextBuilder::new(request)
        .section("Title", &document.title)
        .section("Borrower", &document.term_sheet.borrower)
        .section("Facility", &document.term_sheet.facility_type)
        .section("Recommendation", &document.recommendation)
        .section("Base case", &base_case)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealmemo_document::Scenario;

    #[test]
    fn test_prompt_carries_headlines() {
        let mut doc = Document::new();
        doc.title = "Acme Corp Senior Secured Term Loan".into();
        doc.term_sheet.borrower = "Acme Corp".into();
        doc.recommendation = "Approve".into();
        doc.scenarios.push(Scenario {
            name: "Base Case".into(),
            irr: Some(12.0),
            ..Default::default()
        });

        let prompt = confirmation_prompt("Analyze Acme Corp", &doc);
        assert!(prompt.contains("# Borrower\n\nAcme Corp"));
        assert!(prompt.contains("# Recommendation\n\nApprove"));
        assert!(prompt.contains("\"irr\": 12.0"));
        assert!(!prompt.contains("# Facility"));
    }
}

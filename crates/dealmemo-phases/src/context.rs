//! Rendering of already-merged document sections into prompt context.

use serde::Serialize;
use serde_json::Value;

/// Rules appended to every structured-output instruction.
pub(crate) const JSON_RULES: &str = "\
Respond with a single JSON object and nothing else.
- Use exactly the keys shown in the schema; omit keys you cannot support with evidence.
- Numbers are plain JSON numbers (no currency symbols); percentages are given as written, e.g. 12.5 for 12.5%.
- Do not wrap the object in prose.";

/// Accumulates titled JSON sections, skipping ones with no content.
#[derive(Debug, Default)]
pub(crate) struct ContextBuilder {
    sections: Vec<String>,
}

impl ContextBuilder {
    pub fn new(request: &str) -> Self {
        Self {
            sections: vec![format!("# Request\n\n{}", request.trim())],
        }
    }

    /// Add a section if `value` serializes to something non-empty.
    pub fn section<T: Serialize + ?Sized>(mut self, title: &str, value: &T) -> Self {
        let Ok(json) = serde_json::to_value(value) else {
            return self;
        };
        if !has_content(&json) {
            return self;
        }
        let body = match json {
            Value::String(text) => text,
            other => serde_json::to_string_pretty(&other).unwrap_or_default(),
        };
        self.sections.push(format!("# {title}\n\n{body}"));
        self
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.sections.push(text.into());
        self
    }

    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

/// Whether a JSON value carries anything a model could use.
pub(crate) fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => items.iter().any(has_content),
        Value::Object(map) => map.values().any(has_content),
    }
}

/// Role instructions: persona, task, schema, and output rules.
pub(crate) fn instructions(persona: &str, task: &str, schema: &str) -> String {
    format!("{persona}\n\n{task}\n\nOutput schema:\n{schema}\n\n{JSON_RULES}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_sections_are_skipped() {
        let text = ContextBuilder::new("Analyze Acme Corp")
            .section("Company overview", "")
            .section("Risks", &Vec::<String>::new())
            .section("Term sheet", &json!({ "borrower": "", "fees": [] }))
            .section("Industry", "Specialty chemicals")
            .build();
        assert_eq!(
            text,
            "# Request\n\nAnalyze Acme Corp\n\n# Industry\n\nSpecialty chemicals"
        );
    }

    #[test]
    fn test_structured_sections_are_pretty_json() {
        let text = ContextBuilder::new("r")
            .section("Scenarios", &json!([{ "name": "Base Case", "irr": 14.2 }]))
            .build();
        assert!(text.contains("# Scenarios\n\n[\n  {"));
        assert!(text.contains("\"Base Case\""));
    }

    #[test]
    fn test_has_content_treats_numbers_as_content() {
        assert!(has_content(&json!({ "amount": 0 })));
        assert!(!has_content(&json!({ "a": null, "b": [" "] })));
    }
}

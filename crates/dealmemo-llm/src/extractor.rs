//! Pulls the structured payload out of a multi-segment response.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ContentSegment, LlmResult};

/// Returned when a response carries no text segment.
pub const EMPTY_PAYLOAD: &str = "{}";

/// A whole-text code fence, optionally language-tagged.
static FENCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\s*```$").unwrap());

/// Extract the intended payload from a backend response.
///
/// Selects the first `Text` segment (reasoning and tool segments are
/// skipped), falls back to [`EMPTY_PAYLOAD`] when there is none, then strips
/// a surrounding triple-backtick fence and whitespace. Never fails.
#[must_use]
pub fn extract_payload(result: &LlmResult) -> String {
    let text = result.segments.iter().find_map(|segment| match segment {
        ContentSegment::Text { text } => Some(text.as_str()),
        _ => None,
    });

    match text {
        Some(text) => strip_fence(text),
        None => EMPTY_PAYLOAD.to_string(),
    }
}

/// Remove a surrounding code fence, if any, and trim.
#[must_use]
pub fn strip_fence(text: &str) -> String {
    let trimmed = text.trim();
    match FENCED.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => trimmed.to_string(),
    }
}

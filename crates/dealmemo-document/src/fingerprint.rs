use anyhow::{Context, Result};
use blake3::Hasher;
use serde::Serialize;

use crate::model::Document;

/// Emit a value as JCS-canonical JSON (RFC 8785).
///
/// Used for the written document so identical content is byte-identical.
pub fn emit_jcs<T: Serialize>(value: &T) -> Result<String> {
    let json_value =
        serde_json::to_value(value).with_context(|| "Failed to serialize value to JSON")?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .with_context(|| "Failed to canonicalize JSON using JCS")?;
    String::from_utf8(json_bytes).with_context(|| "JCS output contained invalid UTF-8")
}

impl Document {
    /// BLAKE3 hex digest of the document's canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = emit_jcs(self)?;
        let mut hasher = Hasher::new();
        hasher.update(canonical.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}

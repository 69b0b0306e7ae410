//! Loading of run inputs: request text, attachments, resume document.
//!
//! Problems with user-supplied inputs are reported as configuration errors
//! so they exit with the CLI-arguments code.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use dealmemo_document::Document;
use dealmemo_llm::Attachment;
use dealmemo_utils::error::{ConfigError, DealmemoError};

/// Request text from the argument, else stdin.
pub(crate) fn read_request(arg: Option<String>) -> Result<String> {
    let text = match arg {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read request from stdin")?;
            buffer
        }
    };
    let text = text.trim();
    if text.is_empty() {
        return Err(DealmemoError::Config(ConfigError::MissingRequired(
            "request text (pass it as an argument or on stdin)".to_string(),
        ))
        .into());
    }
    Ok(text.to_string())
}

/// MIME type inferred from a file extension.
pub(crate) fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "csv" => "text/csv",
        "md" | "markdown" => "text/markdown",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Read a file into a base64 attachment.
pub(crate) fn load_attachment(path: &Path) -> Result<Attachment> {
    let bytes = std::fs::read(path).map_err(|e| {
        DealmemoError::Config(ConfigError::InvalidValue {
            key: "--attach".to_string(),
            value: format!("{}: {e}", path.display()),
        })
    })?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(Attachment::from_bytes(name, mime_for(path), &bytes))
}

/// Read a previously written document to resume from.
pub(crate) fn load_document(path: &Path) -> Result<Document> {
    let invalid = |reason: String| {
        DealmemoError::Config(ConfigError::InvalidValue {
            key: "--document".to_string(),
            value: format!("{}: {reason}", path.display()),
        })
    };
    let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let document = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    Ok(document)
}

//! Event rendering and document output.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::args::EventFormat;
use crate::{Document, WorkflowEvent, emit_jcs};

/// One line for an event, without the trailing newline.
pub(crate) fn render_event(event: &WorkflowEvent, format: EventFormat) -> Result<String> {
    match format {
        EventFormat::Ndjson => {
            serde_json::to_string(event).context("Failed to serialize workflow event")
        }
        EventFormat::Text => Ok(format!(
            "[{}] {:<9} {}: {}",
            event.timestamp.format("%H:%M:%S"),
            event.status.to_string(),
            event.agent,
            event.message
        )),
    }
}

/// Write `content` to `path` via a sibling temp file and rename.
///
/// Readers never observe a half-written document.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(content.as_bytes())
        .context("Failed to write document contents")?;
    temp.as_file()
        .sync_all()
        .context("Failed to sync document to disk")?;
    temp.persist(path)
        .with_context(|| format!("Failed to persist document to {}", path.display()))?;
    Ok(())
}

/// Canonical JSON of `document` to `path`, or stdout when `None`.
pub(crate) fn write_document(document: &Document, path: Option<&Path>) -> Result<()> {
    let mut json = emit_jcs(document)?;
    json.push('\n');
    match path {
        Some(path) => {
            write_atomic(path, &json)?;
            tracing::info!(path = %path.display(), "Document written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(json.as_bytes())
                .context("Failed to write document to stdout")?;
            stdout.flush().ok();
        }
    }
    Ok(())
}

/// Success line for a memo written to `path`.
///
/// A fingerprint failure only drops the hash from the line; the memo is
/// already on disk by the time this is shown.
pub(crate) fn written_notice(path: &Path, fingerprint: Result<String>) -> String {
    match fingerprint {
        Ok(hash) => format!("✓ Memo written to {} (blake3 {hash})", path.display()),
        Err(e) => {
            tracing::warn!(error = %e, "Could not fingerprint document");
            format!("✓ Memo written to {}", path.display())
        }
    }
}

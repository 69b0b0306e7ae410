//! Attachment shape and routing.
//!
//! Attachments arrive pre-encoded (`data` is base64 text). PDFs are sent to
//! providers as document inputs and images as visual inputs. Everything else
//! is degraded to an inline text reference with a truncated excerpt and is
//! never sent as binary.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Number of characters of an `Other` attachment quoted inline.
pub const EXCERPT_CHARS: usize = 2000;

/// How a backend should route an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Pdf,
    Image,
    Other,
}

/// A read-only binary input for the first phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Base64-encoded payload
    pub data: String,
}

impl Attachment {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes into an attachment.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(name, mime_type, STANDARD.encode(bytes))
    }

    /// Routing category derived from the MIME type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dealmemo_llm::{Attachment, AttachmentKind};
    ///
    /// assert_eq!(Attachment::new("a.pdf", "application/pdf", "").kind(), AttachmentKind::Pdf);
    /// assert_eq!(Attachment::new("b.png", "image/png", "").kind(), AttachmentKind::Image);
    /// assert_eq!(Attachment::new("c.csv", "text/csv", "").kind(), AttachmentKind::Other);
    /// ```
    #[must_use]
    pub fn kind(&self) -> AttachmentKind {
        let mime = self.mime_type.trim().to_ascii_lowercase();
        if mime == "application/pdf" {
            AttachmentKind::Pdf
        } else if mime.starts_with("image/") {
            AttachmentKind::Image
        } else {
            AttachmentKind::Other
        }
    }

    /// Inline text stand-in for attachments that are not sent as binary.
    ///
    /// The header line names the file and type; the body is the first
    /// [`EXCERPT_CHARS`] characters of the decoded content when it is UTF-8.
    #[must_use]
    pub fn text_reference(&self) -> String {
        let header = format!("Attachment \"{}\" ({})", self.name, self.mime_type);
        let body = match STANDARD.decode(self.data.trim()) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    let total = text.chars().count();
                    let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
                    if total > EXCERPT_CHARS {
                        format!("{excerpt}\n[truncated, {total} characters total]")
                    } else {
                        excerpt
                    }
                }
                Err(e) => format!(
                    "[binary content, {} bytes, not shown]",
                    e.into_bytes().len()
                ),
            },
            Err(_) => "[content could not be decoded]".to_string(),
        };
        format!("{header}\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_case_insensitive() {
        assert_eq!(
            Attachment::new("x", "Application/PDF", "").kind(),
            AttachmentKind::Pdf
        );
        assert_eq!(
            Attachment::new("x", "IMAGE/JPEG", "").kind(),
            AttachmentKind::Image
        );
        assert_eq!(
            Attachment::new("x", "application/vnd.ms-excel", "").kind(),
            AttachmentKind::Other
        );
    }

    #[test]
    fn test_text_reference_quotes_utf8() {
        let att = Attachment::from_bytes("model.csv", "text/csv", b"year,revenue\n2024,120");
        let text = att.text_reference();
        assert!(text.starts_with("Attachment \"model.csv\" (text/csv)\n"));
        assert!(text.ends_with("year,revenue\n2024,120"));
    }

    #[test]
    fn test_text_reference_truncates_long_content() {
        let content = "a".repeat(EXCERPT_CHARS + 50);
        let att = Attachment::from_bytes("notes.txt", "text/plain", content.as_bytes());
        let text = att.text_reference();
        assert!(text.contains(&"a".repeat(EXCERPT_CHARS)));
        assert!(!text.contains(&"a".repeat(EXCERPT_CHARS + 1)));
        assert!(text.contains("truncated, 2050 characters total"));
    }

    #[test]
    fn test_text_reference_binary_and_garbage() {
        let att = Attachment::from_bytes("blob.bin", "application/octet-stream", &[0xff, 0xfe, 0x00]);
        assert!(att.text_reference().contains("[binary content, 3 bytes, not shown]"));

        let att = Attachment::new("bad.txt", "text/plain", "%%% not base64 %%%");
        assert!(att.text_reference().contains("could not be decoded"));
    }

    #[test]
    fn test_serde_uses_mime_type_key() {
        let att: Attachment = serde_json::from_str(
            r#"{"name":"deck.pdf","mimeType":"application/pdf","data":"JVBERi0="}"#,
        )
        .unwrap();
        assert_eq!(att.mime_type, "application/pdf");
        assert_eq!(att.kind(), AttachmentKind::Pdf);
    }
}

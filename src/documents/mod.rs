//! Plain-text extraction from uploaded documents
//!
//! Extractors are picked by file extension. Extracted text is returned to the
//! caller, which may send it back later as a chat request's document context;
//! nothing is stored server-side.

mod pdf;
mod text;

use serde::Serialize;
use std::sync::Arc;

pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("No text could be extracted from the document")]
    Empty,

    #[error("Document is not valid UTF-8 text: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),
}

pub trait TextExtractor: Send + Sync {
    /// Lowercase file extensions handled, without the dot
    fn extensions(&self) -> &[&'static str];

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Extractors keyed by file extension
#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// PDF and plain text
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PdfExtractor));
        registry.register(Arc::new(PlainTextExtractor));
        registry
    }

    pub fn register(&mut self, extractor: Arc<dyn TextExtractor>) {
        tracing::debug!(extensions = ?extractor.extensions(), "Registered text extractor");
        self.extractors.push(extractor);
    }

    /// Extractor for a file name, matched case-insensitively on extension
    pub fn for_filename(&self, filename: &str) -> Result<Arc<dyn TextExtractor>, ExtractError> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        self.extractors
            .iter()
            .find(|x| x.extensions().contains(&extension.as_str()))
            .cloned()
            .ok_or_else(|| ExtractError::Unsupported(filename.to_string()))
    }

    /// All supported extensions, for error messages
    pub fn supported(&self) -> Vec<&'static str> {
        self.extractors
            .iter()
            .flat_map(|x| x.extensions().iter().copied())
            .collect()
    }

    /// Extract and trim; whitespace-only output counts as a failure
    pub fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        let extractor = self.for_filename(filename)?;
        let text = extractor.extract(bytes)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text.to_string())
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Response body of a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct DocumentUpload {
    pub success: bool,
    pub filename: String,
    pub text: String,
    pub preview: String,
}

impl DocumentUpload {
    pub fn new(filename: impl Into<String>, text: String, preview_chars: usize) -> Self {
        Self {
            success: true,
            filename: filename.into(),
            preview: preview(&text, preview_chars),
            text,
        }
    }
}

/// First `max_chars` characters, with "..." appended when text was cut
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_long_text() {
        let text = "a".repeat(10_000);
        let p = preview(&text, 500);
        assert_eq!(p.len(), 503);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_preview_exact_length_untouched() {
        let text = "b".repeat(500);
        assert_eq!(preview(&text, 500), text);
    }

    #[test]
    fn test_preview_counts_chars() {
        let text = "ñ".repeat(600);
        let p = preview(&text, 500);
        assert_eq!(p.chars().count(), 503);
    }

    #[test]
    fn test_registry_by_extension() {
        let registry = ExtractorRegistry::with_defaults();
        assert!(registry.for_filename("report.PDF").is_ok());
        assert!(registry.for_filename("notes.md").is_ok());
        assert!(registry.for_filename("notes.txt").is_ok());
        assert!(matches!(
            registry.for_filename("image.png"),
            Err(ExtractError::Unsupported(_))
        ));
        assert!(matches!(
            registry.for_filename("no_extension"),
            Err(ExtractError::Unsupported(_))
        ));
        assert_eq!(registry.supported(), vec!["pdf", "txt", "md"]);
    }

    #[test]
    fn test_extract_trims_and_rejects_blank() {
        let registry = ExtractorRegistry::with_defaults();
        assert_eq!(registry.extract("a.txt", b"  hello \n").unwrap(), "hello");
        assert!(matches!(
            registry.extract("a.txt", b" \n\t "),
            Err(ExtractError::Empty)
        ));
    }

    #[test]
    fn test_document_upload_shape() {
        let upload = DocumentUpload::new("menu.txt", "x".repeat(600), 500);
        let json = serde_json::to_value(&upload).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["filename"], "menu.txt");
        assert_eq!(json["text"].as_str().unwrap().len(), 600);
        assert_eq!(json["preview"].as_str().unwrap().len(), 503);
    }
}

use super::{ExtractError, TextExtractor};

/// Text layer of a PDF, page by page
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        if !bytes.starts_with(b"%PDF") {
            return Err(ExtractError::Pdf("missing %PDF header".to_string()));
        }
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pdf_bytes() {
        let err = PdfExtractor.extract(b"just some text").unwrap_err();
        assert!(err.to_string().contains("PDF"));
    }

    #[test]
    fn test_extensions() {
        assert_eq!(PdfExtractor.extensions(), &["pdf"]);
    }
}

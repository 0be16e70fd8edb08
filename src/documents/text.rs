use super::{ExtractError, TextExtractor};

/// UTF-8 plain text and Markdown, passed through as-is
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extensions(&self) -> &[&'static str] {
        &["txt", "md"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let text = String::from_utf8(bytes.to_vec())?;
        Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
    }
}

use crate::document::OriginalFile;

use super::{ExtractedText, OcrEngine, StageError};

/// Extraction for plain-text sources: reads the stored file and passes the
/// content through unchanged. Scanned formats (PDF, images) need a real OCR
/// engine injected in its place.
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl OcrEngine for PlainTextExtractor {
    async fn extract(&self, file: &OriginalFile) -> Result<ExtractedText, StageError> {
        if file.mime_type != "text/plain" {
            return Err(StageError::Permanent(format!(
                "Unsupported file type: {}",
                file.mime_type
            )));
        }

        let bytes = tokio::fs::read(&file.storage_path).await.map_err(|e| {
            StageError::Transient(format!(
                "Failed to read {}: {}",
                file.storage_path.display(),
                e
            ))
        })?;

        let text = String::from_utf8(bytes)
            .map_err(|_| StageError::Permanent("File is not valid UTF-8 text".to_string()))?;

        // Form feeds mark page boundaries in plain text.
        let page_count = text.split('\u{0c}').count().max(1) as u32;
        let word_count = text.split_whitespace().count() as u32;

        Ok(ExtractedText {
            text,
            page_count,
            word_count,
        })
    }
}

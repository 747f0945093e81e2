//! Fake stage executors for driving failure and timing scenarios.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dotbridge::document::{BrailleGrade, LanguageCode, OriginalFile};
use dotbridge::stage::{
    BrailleMapper, BrailleOutput, BrailleTransliterator, ExtractedText, OcrEngine, StageError,
};

/// OCR engine that never finishes within a short stage timeout.
pub struct StalledOcr {
    pub delay: Duration,
    pub calls: Arc<AtomicUsize>,
}

impl StalledOcr {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl OcrEngine for StalledOcr {
    async fn extract(&self, _file: &OriginalFile) -> Result<ExtractedText, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(ExtractedText {
            text: "too late".to_string(),
            page_count: 1,
            word_count: 2,
        })
    }
}

/// Transliterator that delegates to the built-in mapper while counting calls.
pub struct CountingTransliterator {
    pub calls: Arc<AtomicUsize>,
    inner: BrailleMapper,
}

impl CountingTransliterator {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            inner: BrailleMapper::new(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for CountingTransliterator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BrailleTransliterator for CountingTransliterator {
    async fn transliterate(
        &self,
        text: &str,
        language: LanguageCode,
        grade: BrailleGrade,
    ) -> Result<BrailleOutput, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.transliterate(text, language, grade).await
    }
}

/// Transliterator that always fails with a permanent error.
pub struct RejectingTransliterator;

#[async_trait::async_trait]
impl BrailleTransliterator for RejectingTransliterator {
    async fn transliterate(
        &self,
        _text: &str,
        _language: LanguageCode,
        _grade: BrailleGrade,
    ) -> Result<BrailleOutput, StageError> {
        Err(StageError::Permanent(
            "No Braille table for this language".to_string(),
        ))
    }
}

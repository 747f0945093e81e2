//! Stage executors: the capability seams the pipeline drives.
//!
//! Each trait wraps one external capability (OCR, Braille transliteration,
//! speech synthesis). Executors are stateless; all progress lives on the
//! document record. Every failure surfaces as a [`StageError`] with a
//! message fit for the document's per-stage audit trail.

pub mod braille;
pub mod ocr;
pub mod speech;

pub use braille::BrailleMapper;
pub use ocr::PlainTextExtractor;

use crate::document::{BrailleGrade, LanguageCode, OriginalFile};

/// Stage failure, classified for the retry policy. Transient failures
/// (I/O, timeouts, unavailable services) are retried with backoff;
/// permanent failures (malformed or unsupported content) fail the stage
/// immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Permanent(String),
}

impl StageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StageError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            StageError::Transient(message) | StageError::Permanent(message) => message,
        }
    }
}

/// Output of the OCR stage.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: u32,
    pub word_count: u32,
}

/// Output of the Braille stage.
#[derive(Debug, Clone)]
pub struct BrailleOutput {
    pub content: String,
    pub confidence: f64,
}

/// Output of the audio stage. `duration_seconds` is `None` when the
/// synthesizer does not measure it; the pipeline then derives it from the
/// WAV header.
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub wav_bytes: Vec<u8>,
    pub duration_seconds: Option<f64>,
}

/// Text extraction from a stored source file.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract(&self, file: &OriginalFile) -> Result<ExtractedText, StageError>;
}

/// Text to Braille cell conversion.
#[async_trait::async_trait]
pub trait BrailleTransliterator: Send + Sync {
    async fn transliterate(
        &self,
        text: &str,
        language: LanguageCode,
        grade: BrailleGrade,
    ) -> Result<BrailleOutput, StageError>;
}

/// Text to speech rendering. WAV output only.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        language: LanguageCode,
    ) -> Result<SynthesizedSpeech, StageError>;
}

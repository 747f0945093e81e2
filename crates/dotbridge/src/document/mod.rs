//! Document data model.
//!
//! A `Document` is the unit of work: the uploaded source file plus the
//! per-stage state accumulated while the pipeline converts it. Value objects
//! (`OriginalFile`, `AudioFile`) are set once and never mutated; the
//! aggregate's `steps` and `metadata` are owned exclusively by the document
//! and only change through pipeline transitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod language;
pub mod translation;

pub use language::LanguageCode;
pub use translation::{Feedback, Translation};

/// Lifecycle status of a document.
///
/// Transitions are monotonic along `uploaded -> processing -> completed|failed`.
/// A `failed` document may re-enter `processing` through an explicit new
/// processing request; nothing ever returns to `uploaded`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(DocumentStatus::Uploaded),
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses accept no further automatic transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Braille transliteration density.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BrailleGrade {
    /// Uncontracted, one cell per character.
    Grade1,
    /// Contracted.
    Grade2,
}

impl BrailleGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrailleGrade::Grade1 => "grade1",
            BrailleGrade::Grade2 => "grade2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "grade1" => Some(BrailleGrade::Grade1),
            "grade2" => Some(BrailleGrade::Grade2),
            _ => None,
        }
    }
}

impl std::fmt::Display for BrailleGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ordered step of the conversion pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Ocr,
    Braille,
    Audio,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Ocr => "ocr",
            StageKind::Braille => "braille",
            StageKind::Audio => "audio",
        }
    }

    /// Pipeline order: OCR feeds Braille feeds audio.
    pub const ORDERED: [StageKind; 3] = [StageKind::Ocr, StageKind::Braille, StageKind::Audio];
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion/error record for a single stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StepState {
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepState {
    /// Marks the stage successful, clearing any error from a prior attempt.
    pub fn succeed(&mut self, at: DateTime<Utc>) {
        self.completed = true;
        self.timestamp = Some(at);
        self.error = None;
    }

    pub fn fail(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.completed = false;
        self.timestamp = Some(at);
        self.error = Some(message.into());
    }
}

/// Per-stage audit trail of the state machine. Never reset wholesale; a
/// stage's error is cleared only when that stage later succeeds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessingSteps {
    #[serde(default)]
    pub ocr: StepState,
    #[serde(default)]
    pub braille: StepState,
    #[serde(default)]
    pub audio: StepState,
}

impl ProcessingSteps {
    pub fn step(&self, kind: StageKind) -> &StepState {
        match kind {
            StageKind::Ocr => &self.ocr,
            StageKind::Braille => &self.braille,
            StageKind::Audio => &self.audio,
        }
    }

    pub fn step_mut(&mut self, kind: StageKind) -> &mut StepState {
        match kind {
            StageKind::Ocr => &mut self.ocr,
            StageKind::Braille => &mut self.braille,
            StageKind::Audio => &mut self.audio,
        }
    }

    /// First stage in pipeline order that has not completed.
    pub fn first_incomplete(&self) -> Option<StageKind> {
        StageKind::ORDERED
            .into_iter()
            .find(|kind| !self.step(*kind).completed)
    }

    /// The stage carrying an error, if any (first in pipeline order).
    pub fn failing_stage(&self) -> Option<StageKind> {
        StageKind::ORDERED
            .into_iter()
            .find(|kind| self.step(*kind).error.is_some())
    }
}

/// The uploaded source blob. Set once at upload, immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OriginalFile {
    pub filename: String,
    pub storage_path: PathBuf,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Synthesized audio rendition. Present only when the audio stage succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioFile {
    pub filename: String,
    pub storage_path: PathBuf,
    pub duration_seconds: f64,
}

/// Braille rendition of the extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrailleTranslation {
    pub content: String,
    pub grade: BrailleGrade,
    pub language: LanguageCode,
}

/// Computed counts and timing. Informational only; no invariants depend on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub character_count: u32,
    #[serde(default)]
    pub processing_time_ms: u64,
}

/// A document and its full conversion lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub original_file: OriginalFile,
    /// Empty until the OCR stage completes.
    pub extracted_text: String,
    /// `Some` iff the Braille stage has completed.
    pub braille: Option<BrailleTranslation>,
    pub audio_file: Option<AudioFile>,
    pub status: DocumentStatus,
    pub steps: ProcessingSteps,
    pub metadata: DocumentMetadata,
    /// Number of processing attempts accepted for this document.
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a freshly uploaded document with a generated id.
    pub fn new(owner: &str, title: &str, original_file: OriginalFile) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            title: title.to_string(),
            original_file,
            extracted_text: String::new(),
            braille: None,
            audio_file: None,
            status: DocumentStatus::Uploaded,
            steps: ProcessingSteps::default(),
            metadata: DocumentMetadata::default(),
            attempt_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a successful OCR result.
    pub fn apply_extracted(&mut self, text: String, at: DateTime<Utc>) {
        self.extracted_text = text;
        self.steps.ocr.succeed(at);
        self.updated_at = at;
    }

    /// Applies a successful Braille transliteration.
    pub fn apply_braille(&mut self, braille: BrailleTranslation, at: DateTime<Utc>) {
        self.braille = Some(braille);
        self.steps.braille.succeed(at);
        self.updated_at = at;
    }

    /// Applies a successful audio synthesis.
    pub fn apply_audio(&mut self, audio: AudioFile, at: DateTime<Utc>) {
        self.audio_file = Some(audio);
        self.steps.audio.succeed(at);
        self.updated_at = at;
    }

    /// Records a stage failure and moves the document to `failed`.
    ///
    /// Stages after the failing one are downgraded: a later attempt may have
    /// left them completed or with a stale error, and the failed state must
    /// show exactly one error with nothing completed after it.
    pub fn record_stage_failure(&mut self, kind: StageKind, message: &str, at: DateTime<Utc>) {
        self.steps.step_mut(kind).fail(message, at);

        let mut later = false;
        for stage in StageKind::ORDERED {
            if later {
                *self.steps.step_mut(stage) = StepState::default();
            }
            if stage == kind {
                later = true;
            }
        }

        // Outputs from the failing stage onward are withdrawn.
        if kind != StageKind::Audio {
            self.braille = None;
        }
        self.audio_file = None;

        self.status = DocumentStatus::Failed;
        self.updated_at = at;
    }

    /// Records a non-fatal stage failure: the step keeps the error but the
    /// document status is left alone (best-effort audio).
    pub fn record_stage_error_only(&mut self, kind: StageKind, message: &str, at: DateTime<Utc>) {
        self.steps.step_mut(kind).fail(message, at);
        self.updated_at = at;
    }

    /// Marks the document completed with its computed metadata.
    pub fn complete(&mut self, metadata: DocumentMetadata, at: DateTime<Utc>) {
        self.metadata = metadata;
        self.status = DocumentStatus::Completed;
        self.updated_at = at;
    }

    /// Rolls back a finalization that could not be committed: the Braille
    /// result (and any audio result) is withdrawn so the failed state keeps
    /// exactly one step error with nothing completed after it, and a fresh
    /// attempt re-runs every stage cleanly.
    pub fn roll_back_finalize(&mut self, reason: &str, at: DateTime<Utc>) {
        self.braille = None;
        self.audio_file = None;
        self.steps.audio = StepState::default();
        self.steps.braille.fail(reason, at);
        self.status = DocumentStatus::Failed;
        self.updated_at = at;
    }
}

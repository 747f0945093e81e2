use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info_span, warn, Instrument};

use crate::broadcast::document_progress::DocumentPhase;
use crate::db::{document_repo, Database};
use crate::document::{
    AudioFile, BrailleGrade, BrailleTranslation, Document, DocumentMetadata, DocumentStatus,
    LanguageCode, StageKind, Translation,
};
use crate::error::{ConflictError, ConsistencyError};
use crate::stage::{
    speech, BrailleMapper, BrailleTransliterator, OcrEngine, PlainTextExtractor,
    SpeechSynthesizer, StageError,
};
use crate::storage::BlobStore;

use super::config::{AudioPolicy, PipelineConfig, StageDescriptor};
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};

/// Requested conversion parameters for one processing attempt.
#[derive(Debug, Clone, Copy)]
pub struct ConversionOptions {
    pub language: LanguageCode,
    pub grade: BrailleGrade,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            language: LanguageCode::En,
            grade: BrailleGrade::Grade1,
        }
    }
}

enum StageOutput {
    Extracted(crate::stage::ExtractedText),
    Braille(crate::stage::BrailleOutput),
    Audio(AudioFile),
}

/// The conversion state machine. Drives one document at a time through the
/// ordered stage plan, persisting after every stage so a crash loses at
/// most the stage in flight.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    db: Database,
    storage: Arc<BlobStore>,
    ocr: Arc<dyn OcrEngine>,
    transliterator: Arc<dyn BrailleTransliterator>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl Pipeline {
    /// Production constructor with the built-in executors and no speech
    /// synthesizer.
    pub fn from_config(config: Arc<PipelineConfig>, db: Database, storage: Arc<BlobStore>) -> Self {
        Self {
            config,
            db,
            storage,
            ocr: Arc::new(PlainTextExtractor::new()),
            transliterator: Arc::new(BrailleMapper::new()),
            synthesizer: None,
        }
    }

    /// Constructor for injected executors (real OCR engines, TTS backends).
    pub fn with_executors(
        config: Arc<PipelineConfig>,
        db: Database,
        storage: Arc<BlobStore>,
        ocr: Arc<dyn OcrEngine>,
        transliterator: Arc<dyn BrailleTransliterator>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        Self {
            config,
            db,
            storage,
            ocr,
            transliterator,
            synthesizer,
        }
    }

    /// Runs one conversion attempt for the owner's document and returns the
    /// terminal record. Accepts only `uploaded` or `failed` documents; any
    /// other status is a conflict.
    pub async fn process(
        &self,
        owner: &str,
        document_id: &str,
        options: ConversionOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<Document, PipelineError> {
        let span = info_span!("pipeline", document_id = %document_id);
        self.process_inner(owner, document_id, options, progress)
            .instrument(span)
            .await
    }

    async fn process_inner(
        &self,
        owner: &str,
        document_id: &str,
        options: ConversionOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<Document, PipelineError> {
        let started = Instant::now();

        let mut doc = document_repo::find_for_owner(&self.db, document_id, owner)?.ok_or_else(
            || PipelineError::NotFound {
                id: document_id.to_string(),
            },
        )?;

        // The conditional status update is the mutual-exclusion primitive:
        // exactly one caller moves the document into processing.
        let accepted_at = Utc::now();
        if !document_repo::try_begin_processing(&self.db, &doc.id, accepted_at)? {
            return match document_repo::find_for_owner(&self.db, document_id, owner)? {
                Some(current) => Err(ConflictError {
                    id: current.id,
                    status: current.status,
                }
                .into()),
                None => Err(PipelineError::NotFound {
                    id: document_id.to_string(),
                }),
            };
        }
        doc.status = DocumentStatus::Processing;
        doc.attempt_count += 1;
        doc.updated_at = accepted_at;

        progress.report(ProgressEvent::Phase {
            phase: DocumentPhase::Accepted,
            message: format!("Processing attempt {} accepted", doc.attempt_count),
        });

        let mut page_count = 0u32;
        let mut word_count = 0u32;
        let mut confidence = 0.8f64;
        let mut braille_result: Option<BrailleTranslation> = None;

        for descriptor in self.stage_plan() {
            progress.report(ProgressEvent::Phase {
                phase: phase_for(descriptor.kind),
                message: stage_message(descriptor.kind).to_string(),
            });

            let span = info_span!("stage", kind = %descriptor.kind);
            let outcome = self
                .execute_with_retry(&descriptor, &doc, options)
                .instrument(span)
                .await;

            match outcome {
                Ok(StageOutput::Extracted(extracted)) => {
                    page_count = extracted.page_count;
                    word_count = extracted.word_count;
                    doc.apply_extracted(extracted.text, Utc::now());
                    document_repo::update(&self.db, &doc)?;
                }
                Ok(StageOutput::Braille(output)) => {
                    confidence = output.confidence;
                    let braille = BrailleTranslation {
                        content: output.content,
                        grade: options.grade,
                        language: options.language,
                    };
                    braille_result = Some(braille.clone());
                    doc.apply_braille(braille, Utc::now());
                    document_repo::update(&self.db, &doc)?;
                }
                Ok(StageOutput::Audio(audio)) => {
                    doc.apply_audio(audio, Utc::now());
                    document_repo::update(&self.db, &doc)?;
                }
                Err(e) if !descriptor.required => {
                    warn!(
                        "{} stage failed on document {}: {}",
                        descriptor.kind,
                        doc.id,
                        e.message()
                    );
                    doc.record_stage_error_only(descriptor.kind, e.message(), Utc::now());
                    document_repo::update(&self.db, &doc)?;
                }
                Err(e) => {
                    doc.record_stage_failure(descriptor.kind, e.message(), Utc::now());
                    document_repo::update(&self.db, &doc)?;
                    progress.report(ProgressEvent::Failed {
                        error: e.message().to_string(),
                    });
                    return Err(PipelineError::Stage {
                        stage: descriptor.kind,
                        source: e,
                    });
                }
            }
        }

        // Finalize: the completed status and the translation audit record
        // land in one transaction.
        let braille = braille_result.expect("braille stage completed before finalization");
        let metadata = DocumentMetadata {
            page_count,
            word_count,
            character_count: doc.extracted_text.chars().count() as u32,
            processing_time_ms: started.elapsed().as_millis() as u64,
        };
        doc.complete(metadata, Utc::now());
        let translation = Translation::for_document(&doc, &braille, confidence);

        if let Err(e) = document_repo::complete_with_translation(&self.db, &doc, &translation) {
            warn!("Failed to finalize document {}: {}", doc.id, e);
            let reason = format!("Translation record could not be saved: {}", e);
            doc.roll_back_finalize(&reason, Utc::now());
            document_repo::update(&self.db, &doc)?;
            progress.report(ProgressEvent::Failed {
                error: reason.clone(),
            });
            return Err(ConsistencyError {
                id: doc.id.clone(),
                reason,
            }
            .into());
        }

        debug!(
            "Document {} completed in {} ms",
            doc.id, doc.metadata.processing_time_ms
        );
        progress.report(ProgressEvent::Completed);
        Ok(doc)
    }

    /// The stage plan for this pipeline instance. Audio without a
    /// synthesizer is skipped under best-effort; under `Required` the stage
    /// stays in the plan and surfaces the missing engine as a failure.
    fn stage_plan(&self) -> Vec<StageDescriptor> {
        let mut plan = self.config.stage_plan();
        if self.synthesizer.is_none() && self.config.audio_policy == AudioPolicy::BestEffort {
            plan.retain(|d| d.kind != StageKind::Audio);
        }
        plan
    }

    async fn execute_with_retry(
        &self,
        descriptor: &StageDescriptor,
        doc: &Document,
        options: ConversionOptions,
    ) -> Result<StageOutput, StageError> {
        let mut attempt = 1;
        loop {
            match self.execute_stage(descriptor, doc, options).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_transient() && attempt < descriptor.retry.max_attempts => {
                    let delay = descriptor.retry.delay_after_attempt(attempt);
                    debug!(
                        "{} stage attempt {}/{} failed ({}), retrying in {:?}",
                        descriptor.kind,
                        attempt,
                        descriptor.retry.max_attempts,
                        e.message(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(StageError::Transient(message)) => {
                    return Err(StageError::Transient(format!(
                        "{} (gave up after {} attempts)",
                        message, attempt
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_stage(
        &self,
        descriptor: &StageDescriptor,
        doc: &Document,
        options: ConversionOptions,
    ) -> Result<StageOutput, StageError> {
        let work = self.invoke_executor(descriptor.kind, doc, options);
        match tokio::time::timeout(descriptor.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(StageError::Transient(format!(
                "{} stage timed out after {:?}",
                descriptor.kind, descriptor.timeout
            ))),
        }
    }

    async fn invoke_executor(
        &self,
        kind: StageKind,
        doc: &Document,
        options: ConversionOptions,
    ) -> Result<StageOutput, StageError> {
        match kind {
            StageKind::Ocr => {
                let extracted = self.ocr.extract(&doc.original_file).await?;
                Ok(StageOutput::Extracted(extracted))
            }
            StageKind::Braille => {
                let output = self
                    .transliterator
                    .transliterate(&doc.extracted_text, options.language, options.grade)
                    .await?;
                Ok(StageOutput::Braille(output))
            }
            StageKind::Audio => {
                let synthesizer = self.synthesizer.as_ref().ok_or_else(|| {
                    StageError::Permanent("No speech synthesizer configured".to_string())
                })?;
                let result = synthesizer
                    .synthesize(&doc.extracted_text, options.language)
                    .await?;
                let duration = speech::resolve_duration(&result);
                let path = self
                    .storage
                    .store(&result.wav_bytes, "audio", &doc.id, "wav")
                    .map_err(|e| StageError::Transient(format!("Failed to store audio: {}", e)))?;
                Ok(StageOutput::Audio(AudioFile {
                    filename: format!("{}_audio.wav", doc.title),
                    storage_path: path,
                    duration_seconds: duration,
                }))
            }
        }
    }
}

fn phase_for(kind: StageKind) -> DocumentPhase {
    match kind {
        StageKind::Ocr => DocumentPhase::Ocr,
        StageKind::Braille => DocumentPhase::Braille,
        StageKind::Audio => DocumentPhase::Audio,
    }
}

fn stage_message(kind: StageKind) -> &'static str {
    match kind {
        StageKind::Ocr => "Extracting text...",
        StageKind::Braille => "Translating to Braille...",
        StageKind::Audio => "Synthesizing audio...",
    }
}

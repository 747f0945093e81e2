//! Test harness for isolated integration test execution.
//!
//! The `TestHarness` struct wires a complete conversion environment into a
//! temporary directory:
//! - An in-memory SQLite database with migrations applied
//! - A `BlobStore` rooted in the temp directory
//! - A `DocumentService` with millisecond retry timings so full conversion
//!   flows finish quickly

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use dotbridge::broadcast::DocumentProgressBroadcaster;
use dotbridge::config::UploadConfig;
use dotbridge::db::Database;
use dotbridge::document::Document;
use dotbridge::identity::CallerContext;
use dotbridge::pipeline::{
    AudioPolicy, ConversionOptions, Pipeline, PipelineConfig, PipelineError, RetryPolicy,
};
use dotbridge::service::{DocumentService, NewDocument};
use dotbridge::stage::{BrailleTransliterator, OcrEngine, SpeechSynthesizer};
use dotbridge::storage::BlobStore;

/// A pipeline configuration with millisecond timings so retry and timeout
/// paths complete quickly under test.
pub fn fast_pipeline_config(audio_policy: AudioPolicy) -> PipelineConfig {
    PipelineConfig {
        ocr_timeout: Duration::from_millis(200),
        braille_timeout: Duration::from_millis(200),
        audio_timeout: Duration::from_millis(200),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            jitter: false,
        },
        audio_policy,
        stale_after: Duration::from_secs(600),
    }
}

/// A caller context for the given user id.
pub fn caller(user_id: &str) -> CallerContext {
    CallerContext::new(user_id)
}

/// Test harness providing an isolated conversion environment.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub service: DocumentService,
}

impl TestHarness {
    /// Create a harness with the built-in executors and no synthesizer.
    /// Audio is skipped under the default best-effort policy.
    pub fn new() -> Self {
        Self::build(AudioPolicy::BestEffort, None)
    }

    /// Create a harness with custom executors.
    pub fn with_executors(
        audio_policy: AudioPolicy,
        ocr: Arc<dyn OcrEngine>,
        transliterator: Arc<dyn BrailleTransliterator>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        Self::build(audio_policy, Some((ocr, transliterator, synthesizer)))
    }

    /// Create a harness with a custom pipeline configuration and custom
    /// executors. Used by timeout and retry scenarios.
    pub fn with_pipeline_config(
        config: PipelineConfig,
        ocr: Arc<dyn OcrEngine>,
        transliterator: Arc<dyn BrailleTransliterator>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_in_memory().expect("Failed to open database");
        let storage = Arc::new(BlobStore::new(temp_dir.path()));
        let pipeline = Pipeline::with_executors(
            Arc::new(config),
            db.clone(),
            Arc::clone(&storage),
            ocr,
            transliterator,
            synthesizer,
        );
        let service = DocumentService::new(
            db.clone(),
            storage,
            pipeline,
            DocumentProgressBroadcaster::new(64),
            UploadConfig::default(),
        );

        Self {
            temp_dir,
            db,
            service,
        }
    }

    fn build(
        audio_policy: AudioPolicy,
        executors: Option<(
            Arc<dyn OcrEngine>,
            Arc<dyn BrailleTransliterator>,
            Option<Arc<dyn SpeechSynthesizer>>,
        )>,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_in_memory().expect("Failed to open database");
        let storage = Arc::new(BlobStore::new(temp_dir.path()));
        let config = Arc::new(fast_pipeline_config(audio_policy));

        let pipeline = match executors {
            Some((ocr, transliterator, synthesizer)) => Pipeline::with_executors(
                config,
                db.clone(),
                Arc::clone(&storage),
                ocr,
                transliterator,
                synthesizer,
            ),
            None => Pipeline::from_config(config, db.clone(), Arc::clone(&storage)),
        };
        let service = DocumentService::new(
            db.clone(),
            storage,
            pipeline,
            DocumentProgressBroadcaster::new(64),
            UploadConfig::default(),
        );

        Self {
            temp_dir,
            db,
            service,
        }
    }

    /// Get the base temp directory path.
    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Upload a plain-text document and return the stored record.
    pub fn upload_text(&self, caller: &CallerContext, title: &str, content: &str) -> Document {
        self.service
            .create_document(
                caller,
                NewDocument {
                    title: title.to_string(),
                    filename: format!("{}.txt", title.to_lowercase().replace(' ', "-")),
                    content: content.as_bytes().to_vec(),
                },
            )
            .expect("Failed to create document")
    }

    /// Run one conversion attempt with default options.
    pub async fn process(
        &self,
        caller: &CallerContext,
        document_id: &str,
    ) -> Result<Document, PipelineError> {
        self.service
            .process(caller, document_id, ConversionOptions::default())
            .await
    }

    /// Upload a plain-text document and convert it, panicking on failure.
    pub async fn convert_text(
        &self,
        caller: &CallerContext,
        title: &str,
        content: &str,
    ) -> Document {
        let doc = self.upload_text(caller, title, content);
        self.process(caller, &doc.id)
            .await
            .expect("Conversion failed")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

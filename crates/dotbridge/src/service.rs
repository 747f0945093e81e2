//! The service façade.
//!
//! Every externally-visible operation lives here, gated on the resolved
//! caller: upload, processing, reads, downloads, deletion, and the
//! translation review surface. The façade owns the pipeline, the blob
//! store, and the progress broadcaster.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use log::info;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::broadcast::{DocumentProgressBroadcaster, DocumentProgressEvent};
use crate::config::{AppConfig, UploadConfig};
use crate::db::document_repo::DocumentQuery;
use crate::db::translation_repo::{TranslationQuery, TranslationStats};
use crate::db::{document_repo, translation_repo, Database};
use crate::document::{Document, DocumentStatus, Feedback, OriginalFile, Translation};
use crate::error::{DotbridgeError, Result, StorageError, ValidationError};
use crate::identity::CallerContext;
use crate::pipeline::{
    BroadcastProgress, ConversionOptions, Pipeline, PipelineConfig, PipelineError,
};
use crate::storage::BlobStore;

const MAX_TITLE_LENGTH: usize = 200;
const RECENT_LIMIT: u64 = 10;

/// An upload request.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub filename: String,
    pub content: Vec<u8>,
}

/// One page of a document listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPage {
    pub items: Vec<Document>,
    pub total: u64,
}

/// One page of a translation listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationPage {
    pub items: Vec<Translation>,
    pub total: u64,
}

/// Braille rendition packaged for download.
#[derive(Debug)]
pub struct BrailleDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Stored WAV opened for async streaming.
#[derive(Debug)]
pub struct AudioStream {
    pub filename: String,
    pub file: tokio::fs::File,
    pub size_bytes: u64,
}

pub struct DocumentService {
    db: Database,
    storage: Arc<BlobStore>,
    pipeline: Pipeline,
    broadcaster: DocumentProgressBroadcaster,
    upload: UploadConfig,
}

impl DocumentService {
    pub fn new(
        db: Database,
        storage: Arc<BlobStore>,
        pipeline: Pipeline,
        broadcaster: DocumentProgressBroadcaster,
        upload: UploadConfig,
    ) -> Self {
        Self {
            db,
            storage,
            pipeline,
            broadcaster,
            upload,
        }
    }

    /// Builds the service from configuration with the built-in executors.
    pub fn from_config(config: &AppConfig, db: Database) -> Self {
        let storage = Arc::new(BlobStore::new(&config.storage_root));
        let pipeline_config = Arc::new(PipelineConfig::from_settings(&config.pipeline));
        let pipeline = Pipeline::from_config(pipeline_config, db.clone(), Arc::clone(&storage));

        Self::new(
            db,
            storage,
            pipeline,
            DocumentProgressBroadcaster::new(config.broadcast_capacity),
            config.upload.clone(),
        )
    }

    /// New subscription to the progress event stream.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<DocumentProgressEvent> {
        self.broadcaster.subscribe()
    }

    /// Validates and accepts an upload: stores the blob, inserts the
    /// document row with `uploaded` status.
    pub fn create_document(
        &self,
        caller: &CallerContext,
        upload: NewDocument,
    ) -> Result<Document> {
        let title = upload.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let title_len = title.chars().count();
        if title_len > MAX_TITLE_LENGTH {
            return Err(ValidationError::TitleTooLong {
                len: title_len,
                max: MAX_TITLE_LENGTH,
            }
            .into());
        }

        let extension = Path::new(&upload.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.upload.allowed_extensions.contains(&extension) {
            return Err(ValidationError::UnsupportedExtension { extension }.into());
        }

        let size_bytes = upload.content.len() as u64;
        if size_bytes > self.upload.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size: size_bytes,
                max: self.upload.max_size_bytes,
            }
            .into());
        }

        let mime_type = mime_guess::from_path(&upload.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let blob_name = uuid::Uuid::new_v4().to_string();
        let storage_path = self
            .storage
            .store(&upload.content, "uploads", &blob_name, &extension)?;

        let doc = Document::new(
            &caller.user_id,
            title,
            OriginalFile {
                filename: upload.filename,
                storage_path,
                mime_type,
                size_bytes,
            },
        );
        document_repo::insert(&self.db, &doc)?;

        info!("Document {} created for {}", doc.id, caller.user_id);
        Ok(doc)
    }

    /// Runs one conversion attempt, streaming progress to subscribers.
    pub async fn process(
        &self,
        caller: &CallerContext,
        document_id: &str,
        options: ConversionOptions,
    ) -> std::result::Result<Document, PipelineError> {
        let doc = document_repo::find_for_owner(&self.db, document_id, &caller.user_id)?
            .ok_or_else(|| PipelineError::NotFound {
                id: document_id.to_string(),
            })?;

        let progress = BroadcastProgress::new(
            &doc.id,
            &doc.title,
            doc.attempt_count + 1,
            self.broadcaster.sender(),
        );
        self.pipeline
            .process(&caller.user_id, document_id, options, &progress)
            .await
    }

    pub fn get(&self, caller: &CallerContext, document_id: &str) -> Result<Document> {
        document_repo::find_for_owner(&self.db, document_id, &caller.user_id)?.ok_or_else(|| {
            DotbridgeError::DocumentNotFound {
                id: document_id.to_string(),
            }
        })
    }

    pub fn list(&self, caller: &CallerContext, query: &DocumentQuery) -> Result<DocumentPage> {
        let (items, total) = document_repo::query(&self.db, &caller.user_id, query)?;
        Ok(DocumentPage { items, total })
    }

    /// The caller's 10 most recent documents.
    pub fn recent(&self, caller: &CallerContext) -> Result<Vec<Document>> {
        Ok(document_repo::recent(&self.db, &caller.user_id, RECENT_LIMIT)?)
    }

    pub fn count_by_status(
        &self,
        caller: &CallerContext,
        status: DocumentStatus,
    ) -> Result<u64> {
        Ok(document_repo::count_by_status(
            &self.db,
            &caller.user_id,
            status,
        )?)
    }

    /// The Braille rendition as downloadable bytes.
    pub fn download_braille(
        &self,
        caller: &CallerContext,
        document_id: &str,
    ) -> Result<BrailleDownload> {
        let doc = self.get(caller, document_id)?;
        let braille = doc
            .braille
            .as_ref()
            .ok_or_else(|| DotbridgeError::BrailleNotAvailable { id: doc.id.clone() })?;

        Ok(BrailleDownload {
            filename: format!("{}_braille.brf", doc.title),
            bytes: braille.content.clone().into_bytes(),
        })
    }

    /// Opens the stored WAV for async streaming.
    pub async fn stream_audio(
        &self,
        caller: &CallerContext,
        document_id: &str,
    ) -> Result<AudioStream> {
        let doc = self.get(caller, document_id)?;
        let audio = doc
            .audio_file
            .as_ref()
            .ok_or_else(|| DotbridgeError::AudioNotAvailable { id: doc.id.clone() })?;

        let file = tokio::fs::File::open(&audio.storage_path)
            .await
            .map_err(|e| StorageError::ReadFile {
                path: audio.storage_path.clone(),
                source: e,
            })?;
        let size_bytes = file
            .metadata()
            .await
            .map_err(|e| StorageError::ReadFile {
                path: audio.storage_path.clone(),
                source: e,
            })?
            .len();

        Ok(AudioStream {
            filename: format!("{}_audio.wav", doc.title),
            file,
            size_bytes,
        })
    }

    /// Removes the stored blobs, the document row, and (through the cascade)
    /// its translation records.
    pub fn delete(&self, caller: &CallerContext, document_id: &str) -> Result<()> {
        let doc = self.get(caller, document_id)?;

        self.storage.remove(&doc.original_file.storage_path)?;
        if let Some(audio) = &doc.audio_file {
            self.storage.remove(&audio.storage_path)?;
        }
        document_repo::delete(&self.db, &doc.id)?;

        info!("Document {} deleted by {}", doc.id, caller.user_id);
        Ok(())
    }

    pub fn list_translations(
        &self,
        caller: &CallerContext,
        query: &TranslationQuery,
    ) -> Result<TranslationPage> {
        let (items, total) = translation_repo::query(&self.db, &caller.user_id, query)?;
        Ok(TranslationPage { items, total })
    }

    pub fn get_translation(
        &self,
        caller: &CallerContext,
        translation_id: &str,
    ) -> Result<Translation> {
        translation_repo::find_for_owner(&self.db, translation_id, &caller.user_id)?.ok_or_else(
            || DotbridgeError::TranslationNotFound {
                id: translation_id.to_string(),
            },
        )
    }

    /// Marks a translation verified (or withdraws verification) on behalf
    /// of the caller.
    pub fn verify_translation(
        &self,
        caller: &CallerContext,
        translation_id: &str,
        is_verified: bool,
    ) -> Result<Translation> {
        let updated = translation_repo::mark_verified(
            &self.db,
            translation_id,
            &caller.user_id,
            is_verified,
            &caller.user_id,
            Utc::now(),
        )?;
        if !updated {
            return Err(DotbridgeError::TranslationNotFound {
                id: translation_id.to_string(),
            });
        }

        self.get_translation(caller, translation_id)
    }

    /// Attaches reviewer feedback. Rating must be 1 to 5.
    pub fn submit_feedback(
        &self,
        caller: &CallerContext,
        translation_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Translation> {
        if !(1..=5).contains(&rating) {
            return Err(ValidationError::InvalidRating { rating }.into());
        }

        let feedback = Feedback { rating, comment };
        let updated =
            translation_repo::set_feedback(&self.db, translation_id, &caller.user_id, &feedback)?;
        if !updated {
            return Err(DotbridgeError::TranslationNotFound {
                id: translation_id.to_string(),
            });
        }

        self.get_translation(caller, translation_id)
    }

    pub fn translation_stats(&self, caller: &CallerContext) -> Result<TranslationStats> {
        Ok(translation_repo::stats_overview(&self.db, &caller.user_id)?)
    }
}

use std::path::PathBuf;
use thiserror::Error;

use crate::document::DocumentStatus;

#[derive(Error, Debug)]
pub enum DotbridgeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Translation not found: {id}")]
    TranslationNotFound { id: String },

    #[error("Document {id} has no Braille translation")]
    BrailleNotAvailable { id: String },

    #[error("Document {id} has no audio file")]
    AudioNotAvailable { id: String },
}

/// Rejected input at the service boundary. Permanent; never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Title exceeds {max} characters (got {len})")]
    TitleTooLong { len: usize, max: usize },

    #[error("File type '{extension}' not supported")]
    UnsupportedExtension { extension: String },

    #[error("File size {size} exceeds maximum of {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Unsupported language code: {code}")]
    UnsupportedLanguage { code: String },

    #[error("Unsupported Braille grade: {grade}")]
    UnsupportedGrade { grade: String },

    #[error("Rating must be between 1 and 5 (got {rating})")]
    InvalidRating { rating: u8 },
}

/// The document is not in the status the operation requires.
/// Callers must re-fetch the document before deciding what to do next.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Document {id} is {status}, expected uploaded or failed")]
pub struct ConflictError {
    pub id: String,
    pub status: DocumentStatus,
}

/// Post-success bookkeeping failed: the document could not be finalized
/// together with its translation record and was rolled to failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Document {id} could not be finalized: {reason}")]
pub struct ConsistencyError {
    pub id: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Unknown or expired token")]
    Unauthorized,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation error: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, DotbridgeError>;

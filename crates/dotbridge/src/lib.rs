pub mod broadcast;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod reconcile;
pub mod service;
pub mod stage;
pub mod storage;

pub use broadcast::{DocumentProgressBroadcaster, DocumentProgressEvent};
pub use config::{load_config, AppConfig};
pub use db::Database;
pub use document::{BrailleGrade, Document, DocumentStatus, LanguageCode, Translation};
pub use error::{ConfigError, DotbridgeError, Result, StorageError, ValidationError};
pub use identity::{CallerContext, IdentityProvider, StaticTokens};
pub use pipeline::{AudioPolicy, ConversionOptions, Pipeline, PipelineConfig, PipelineError};
pub use reconcile::Reconciler;
pub use service::{DocumentService, NewDocument};
pub use storage::BlobStore;

use thiserror::Error;

use crate::document::StageKind;
use crate::error::{ConflictError, ConsistencyError, StorageError};
use crate::stage::StageError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document not found: {id}")]
    NotFound { id: String },

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: StageKind,
        #[source]
        source: StageError,
    },

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

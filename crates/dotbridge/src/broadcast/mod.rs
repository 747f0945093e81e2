//! Broadcasting module for real-time conversion progress streaming.

pub mod document_progress;

pub use document_progress::{
    DocumentPhase, DocumentProgressBroadcaster, DocumentProgressEvent, DocumentProgressTracker,
    ProgressStatus,
};

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::document_progress::{
    DocumentPhase, DocumentProgressEvent, DocumentProgressTracker,
};

/// Events emitted by the pipeline while converting a document.
pub enum ProgressEvent {
    Phase {
        phase: DocumentPhase,
        message: String,
    },
    Completed,
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for callers without observers.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events to the broadcast channel.
pub struct BroadcastProgress {
    tracker: DocumentProgressTracker,
}

impl BroadcastProgress {
    pub fn new(
        document_id: &str,
        title: &str,
        attempt: u32,
        sender: Arc<broadcast::Sender<DocumentProgressEvent>>,
    ) -> Self {
        Self {
            tracker: DocumentProgressTracker::new(document_id, title, attempt, sender),
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                self.tracker.update_phase(phase, &message);
            }
            ProgressEvent::Completed => {
                self.tracker.completed();
            }
            ProgressEvent::Failed { error } => {
                self.tracker.failed(&error);
            }
        }
    }
}

//! Document progress broadcaster for real-time conversion status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of document conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPhase {
    Accepted,
    Ocr,
    Braille,
    Audio,
    Completed,
    Failed,
}

impl std::fmt::Display for DocumentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentPhase::Accepted => write!(f, "Accepted"),
            DocumentPhase::Ocr => write!(f, "Extracting text"),
            DocumentPhase::Braille => write!(f, "Translating to Braille"),
            DocumentPhase::Audio => write!(f, "Synthesizing audio"),
            DocumentPhase::Completed => write!(f, "Completed"),
            DocumentPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Overall status carried by a progress event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Failed,
}

/// Progress event for a document conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProgressEvent {
    /// Document being converted.
    pub document_id: String,
    /// Document title.
    pub title: String,
    /// Current conversion phase.
    pub phase: DocumentPhase,
    /// Overall conversion status.
    pub status: ProgressStatus,
    /// Human-readable message describing current activity.
    pub message: String,
    /// Processing attempt this event belongs to.
    pub attempt: u32,
    /// Timestamp of this event.
    pub timestamp: DateTime<Utc>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentProgressEvent {
    /// Creates a new progress event.
    pub fn new(
        document_id: &str,
        title: &str,
        phase: DocumentPhase,
        message: &str,
        attempt: u32,
    ) -> Self {
        let status = match phase {
            DocumentPhase::Completed => ProgressStatus::Completed,
            DocumentPhase::Failed => ProgressStatus::Failed,
            _ => ProgressStatus::Processing,
        };

        Self {
            document_id: document_id.to_string(),
            title: title.to_string(),
            phase,
            status,
            message: message.to_string(),
            attempt,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Creates a completion event.
    pub fn completed(document_id: &str, title: &str, attempt: u32) -> Self {
        Self::new(
            document_id,
            title,
            DocumentPhase::Completed,
            "Conversion completed successfully",
            attempt,
        )
    }

    /// Creates a failure event.
    pub fn failed(document_id: &str, title: &str, error: &str, attempt: u32) -> Self {
        let mut event = Self::new(
            document_id,
            title,
            DocumentPhase::Failed,
            "Conversion failed",
            attempt,
        );
        event.error = Some(error.to_string());
        event
    }
}

/// Broadcasts document progress events for streaming.
#[derive(Clone)]
pub struct DocumentProgressBroadcaster {
    sender: Arc<broadcast::Sender<DocumentProgressEvent>>,
}

impl DocumentProgressBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: DocumentProgressEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    /// Creates a new subscriber for progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker for one conversion attempt and announces it.
    pub fn start_document(&self, document_id: &str, title: &str, attempt: u32) -> DocumentProgressTracker {
        let tracker =
            DocumentProgressTracker::new(document_id, title, attempt, Arc::clone(&self.sender));

        tracker.update_phase(DocumentPhase::Accepted, "Conversion attempt accepted");

        tracker
    }

    /// Gets the inner sender for creating trackers.
    pub fn sender(&self) -> Arc<broadcast::Sender<DocumentProgressEvent>> {
        Arc::clone(&self.sender)
    }
}

impl Default for DocumentProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Tracks progress for a single conversion attempt.
pub struct DocumentProgressTracker {
    document_id: String,
    title: String,
    attempt: u32,
    sender: Arc<broadcast::Sender<DocumentProgressEvent>>,
}

impl DocumentProgressTracker {
    /// Creates a new tracker.
    pub fn new(
        document_id: &str,
        title: &str,
        attempt: u32,
        sender: Arc<broadcast::Sender<DocumentProgressEvent>>,
    ) -> Self {
        Self {
            document_id: document_id.to_string(),
            title: title.to_string(),
            attempt,
            sender,
        }
    }

    /// Updates the current phase with a message.
    pub fn update_phase(&self, phase: DocumentPhase, message: &str) {
        let event = DocumentProgressEvent::new(
            &self.document_id,
            &self.title,
            phase,
            message,
            self.attempt,
        );
        let _ = self.sender.send(event);
    }

    /// Marks the conversion as completed.
    pub fn completed(&self) {
        let event = DocumentProgressEvent::completed(&self.document_id, &self.title, self.attempt);
        let _ = self.sender.send(event);
    }

    /// Marks the conversion as failed with an error message.
    pub fn failed(&self, error: &str) {
        let event =
            DocumentProgressEvent::failed(&self.document_id, &self.title, error, self.attempt);
        let _ = self.sender.send(event);
    }
}

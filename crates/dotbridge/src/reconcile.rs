//! Reconciliation sweep for abandoned processing attempts.
//!
//! A crash between the `processing` transition and the terminal write
//! leaves a document stuck. The sweep finds rows whose `updated_at` is
//! older than the staleness cutoff and marks them failed through a guarded
//! write, so an attempt that is merely slow and still finishing is never
//! clobbered.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db::{document_repo, Database, DatabaseError};

pub struct Reconciler {
    db: Database,
    stale_after: Duration,
}

impl Reconciler {
    pub fn new(db: Database, stale_after: Duration) -> Self {
        Self { db, stale_after }
    }

    /// Runs one sweep pass. Returns how many documents were marked failed.
    pub fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let cutoff = now - chrono::Duration::seconds(self.stale_after.as_secs() as i64);
        let stale = document_repo::find_stale_processing(&self.db, cutoff)?;

        let mut reconciled = 0;
        for mut doc in stale {
            let stuck_since = doc.updated_at;
            let message = format!(
                "Processing attempt abandoned after {} seconds without progress",
                self.stale_after.as_secs()
            );
            match doc.steps.first_incomplete() {
                Some(stage) => doc.record_stage_failure(stage, &message, now),
                // Every stage finished but the terminal write never landed.
                None => doc.roll_back_finalize(&message, now),
            }

            if document_repo::fail_if_processing(&self.db, &doc)? {
                warn!(
                    "Document {} stuck in processing since {}, marked failed",
                    doc.id, stuck_since
                );
                reconciled += 1;
            } else {
                debug!("Document {} finished while being reconciled", doc.id);
            }
        }

        Ok(reconciled)
    }

    /// Spawns the periodic sweep on the tokio runtime. The first sweep runs
    /// immediately, which recovers documents orphaned by a previous crash.
    pub fn spawn(self, every: Duration) -> ReconcilerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.sweep_once(Utc::now()) {
                            Ok(0) => {}
                            Ok(n) => info!("Reconciled {} stale document(s)", n),
                            Err(e) => error!("Reconciliation sweep failed: {}", e),
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Reconciler received shutdown signal");
                        break;
                    }
                }
            }
            debug!("Reconciler stopped");
        });

        ReconcilerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

pub struct ReconcilerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Signals the sweep loop to stop and returns its join handle.
    pub fn shutdown(self) -> JoinHandle<()> {
        info!("Shutting down reconciler...");
        let _ = self.shutdown.send(true);
        self.task
    }
}

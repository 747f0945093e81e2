use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::document::StageKind;

/// What the audio stage means for the document's outcome.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioPolicy {
    /// Never run the audio stage.
    Skip,
    /// Run it; a failure is recorded on the audio step without failing the
    /// document.
    #[default]
    BestEffort,
    /// Run it; a failure fails the document.
    Required,
}

/// Retry policy for transient stage failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Backoff before re-running a stage after failed attempt `attempt`
    /// (1-based): base doubled per attempt, plus up to 50% random jitter.
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.base_delay_ms.saturating_mul(1u64 << exponent);
        let jitter = if self.jitter {
            (base as f64 * 0.5 * rand::random::<f64>()) as u64
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }
}

/// One entry in the ordered stage plan.
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    pub kind: StageKind,
    /// A required stage's failure fails the document.
    pub required: bool,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

pub struct PipelineConfig {
    pub ocr_timeout: Duration,
    pub braille_timeout: Duration,
    pub audio_timeout: Duration,
    pub retry: RetryPolicy,
    pub audio_policy: AudioPolicy,
    /// A `processing` document untouched for this long is considered
    /// abandoned by the reconciliation sweep.
    pub stale_after: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_timeout: Duration::from_secs(60),
            braille_timeout: Duration::from_secs(30),
            audio_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            audio_policy: AudioPolicy::default(),
            stale_after: Duration::from_secs(600),
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &crate::config::PipelineSettings) -> Self {
        Self {
            ocr_timeout: Duration::from_secs(settings.ocr_timeout_secs),
            braille_timeout: Duration::from_secs(settings.braille_timeout_secs),
            audio_timeout: Duration::from_secs(settings.audio_timeout_secs),
            retry: settings.retry.clone(),
            audio_policy: settings.audio_policy,
            stale_after: Duration::from_secs(settings.stale_after_secs),
        }
    }

    /// The ordered stage sequence for one conversion attempt. New stages
    /// slot in here without touching the orchestrator's control flow.
    pub fn stage_plan(&self) -> Vec<StageDescriptor> {
        let mut plan = vec![
            StageDescriptor {
                kind: StageKind::Ocr,
                required: true,
                timeout: self.ocr_timeout,
                retry: self.retry.clone(),
            },
            StageDescriptor {
                kind: StageKind::Braille,
                required: true,
                timeout: self.braille_timeout,
                retry: self.retry.clone(),
            },
        ];

        if self.audio_policy != AudioPolicy::Skip {
            plan.push(StageDescriptor {
                kind: StageKind::Audio,
                required: self.audio_policy == AudioPolicy::Required,
                timeout: self.audio_timeout,
                retry: self.retry.clone(),
            });
        }

        plan
    }
}

//! The conversion pipeline: ordered stages with per-stage timeout, retry
//! with exponential backoff, and transactional finalization.

pub mod config;
pub mod error;
pub mod progress;
pub mod runner;

pub use config::{AudioPolicy, PipelineConfig, RetryPolicy, StageDescriptor};
pub use error::PipelineError;
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::{ConversionOptions, Pipeline};

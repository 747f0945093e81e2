//! Application configuration.
//!
//! Loaded from a YAML file; every field has a default so an empty file (or
//! no file at all) yields a working configuration under `~/.dotbridge`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pipeline::{AudioPolicy, RetryPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            storage_root: default_storage_root(),
            upload: UploadConfig::default(),
            pipeline: PipelineSettings::default(),
            broadcast_capacity: default_broadcast_capacity(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
        }
    }
}

fn default_database_path() -> PathBuf {
    crate::db::default_database_path()
        .unwrap_or_else(|| PathBuf::from(".dotbridge/data/dotbridge.db"))
}

fn default_storage_root() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".dotbridge").join("files"))
        .unwrap_or_else(|| PathBuf::from(".dotbridge/files"))
}

fn default_broadcast_capacity() -> usize {
    100
}

fn default_reconcile_interval_secs() -> u64 {
    60
}

/// Upload acceptance limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
    /// Lowercase extensions without the dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_max_size_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["pdf", "png", "jpg", "jpeg", "docx", "txt"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Pipeline tuning knobs as they appear in the config file. Durations are
/// plain seconds; [`crate::pipeline::PipelineConfig`] carries the typed form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,
    #[serde(default = "default_braille_timeout_secs")]
    pub braille_timeout_secs: u64,
    #[serde(default = "default_audio_timeout_secs")]
    pub audio_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub audio_policy: AudioPolicy,
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            ocr_timeout_secs: default_ocr_timeout_secs(),
            braille_timeout_secs: default_braille_timeout_secs(),
            audio_timeout_secs: default_audio_timeout_secs(),
            retry: RetryPolicy::default(),
            audio_policy: AudioPolicy::default(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_ocr_timeout_secs() -> u64 {
    60
}

fn default_braille_timeout_secs() -> u64 {
    30
}

fn default_audio_timeout_secs() -> u64 {
    120
}

fn default_stale_after_secs() -> u64 {
    600
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.upload.max_size_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "upload.max_size_bytes must be greater than 0".to_string(),
        });
    }

    if config.upload.allowed_extensions.is_empty() {
        return Err(ConfigError::Validation {
            message: "upload.allowed_extensions must not be empty".to_string(),
        });
    }

    for ext in &config.upload.allowed_extensions {
        if ext.starts_with('.') || ext.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Validation {
                message: format!(
                    "upload.allowed_extensions entries must be lowercase without the dot (got '{}')",
                    ext
                ),
            });
        }
    }

    if config.pipeline.retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "pipeline.retry.max_attempts must be greater than 0".to_string(),
        });
    }

    if config.broadcast_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "broadcast_capacity must be greater than 0".to_string(),
        });
    }

    Ok(())
}

/// Returns the canonical config path: `~/.dotbridge/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".dotbridge").join("config.yaml"))
}

//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [llm]        # text model used by the chef and layout agents
//! [image]      # image model used by the photographer agent
//! [pipeline]   # retry policy, conversational history, retrieval depth
//! [storage]    # database file and media root
//! [worker]     # background worker pool sizing
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default values shared by the config types and their consumers.
pub mod defaults {
    pub const TEXT_MODEL: &str = "gemini-2.5-flash";
    pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const ASPECT_RATIO: &str = "4:3";
    pub const RETRY_MAX: u32 = 3;
    pub const RETRY_BACKOFF_MS: u64 = 500;
    pub const TIMEOUT_SECS: u64 = 300;
    pub const IMAGE_ATTEMPTS: u32 = 3;
    pub const IMAGE_BACKOFF_SECS: u64 = 5;
    pub const HISTORY_TURNS: usize = 3;
    pub const KNOWLEDGE_RESULTS: usize = 5;
    pub const DATABASE_FILE: &str = "mise.db";
    pub const WORKER_CONCURRENCY: usize = 4;
    pub const QUEUE_CAPACITY: usize = 64;
}

/// Aspect ratios accepted by the image model.
pub const ALLOWED_ASPECT_RATIOS: [&str; 10] = [
    "1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9",
];

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiseConfig {
    pub llm: Option<LlmConfig>,
    pub image: Option<ImageConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub storage: Option<StorageConfig>,
    pub worker: Option<WorkerConfig>,
}

impl MiseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: MiseConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }
        if other.image.is_some() {
            self.image = other.image;
        }
        if other.pipeline.is_some() {
            self.pipeline = other.pipeline;
        }
        if other.storage.is_some() {
            self.storage = other.storage;
        }
        if other.worker.is_some() {
            self.worker = other.worker;
        }
    }

    /// Check values that serde cannot reject on its own.
    pub fn validate(&self) -> Result<()> {
        let image = self.image();
        if !ALLOWED_ASPECT_RATIOS.contains(&image.aspect_ratio.as_str()) {
            return Err(ConfigError::Invalid {
                field: "image.aspect_ratio".to_string(),
                reason: format!(
                    "'{}' is not one of {}",
                    image.aspect_ratio,
                    ALLOWED_ASPECT_RATIOS.join(", ")
                ),
            });
        }
        if self.pipeline().image_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "pipeline.image_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.worker().concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "worker.concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Effective `[llm]` section.
    pub fn llm(&self) -> LlmConfig {
        self.llm.clone().unwrap_or_default()
    }

    /// Effective `[image]` section.
    pub fn image(&self) -> ImageConfig {
        self.image.clone().unwrap_or_default()
    }

    /// Effective `[pipeline]` section.
    pub fn pipeline(&self) -> PipelineConfig {
        self.pipeline.clone().unwrap_or_default()
    }

    /// Effective `[storage]` section.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// Effective `[worker]` section.
    pub fn worker(&self) -> WorkerConfig {
        self.worker.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM
// ─────────────────────────────────────────────────────────────────────────────

/// Supported generative backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gemini,
    /// Scripted in-process backend, for dry runs and tests.
    Mock,
}

impl Backend {
    /// Environment variables checked for this backend's API key, in order.
    pub fn env_vars(&self) -> &'static [&'static str] {
        match self {
            Backend::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Backend::Mock => &[],
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !self.env_vars().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Gemini => "gemini",
            Backend::Mock => "mock",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text-generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub backend: Backend,
    pub model: String,
    pub base_url: String,
    /// API key (prefer an env var; warns if set here).
    pub api_key: Option<String>,
    /// Transport-level retries on network and rate-limit errors.
    pub retry_max: u32,
    pub retry_backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            model: defaults::TEXT_MODEL.to_string(),
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            api_key: None,
            retry_max: defaults::RETRY_MAX,
            retry_backoff_ms: defaults::RETRY_BACKOFF_MS,
            timeout_secs: defaults::TIMEOUT_SECS,
        }
    }
}

impl LlmConfig {
    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Image-generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub model: String,
    pub aspect_ratio: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: defaults::IMAGE_MODEL.to_string(),
            aspect_ratio: defaults::ASPECT_RATIO.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline / Storage / Worker
// ─────────────────────────────────────────────────────────────────────────────

/// Orchestrator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Total attempts per step image.
    pub image_attempts: u32,
    /// Delay unit: the wait before attempt `n + 1` is `n * unit`.
    pub image_backoff_secs: u64,
    /// Prompt/response pairs replayed to an agent within one session.
    pub history_turns: usize,
    /// Knowledge documents retrieved for the chef agent.
    pub knowledge_results: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_attempts: defaults::IMAGE_ATTEMPTS,
            image_backoff_secs: defaults::IMAGE_BACKOFF_SECS,
            history_turns: defaults::HISTORY_TURNS,
            knowledge_results: defaults::KNOWLEDGE_RESULTS,
        }
    }
}

impl PipelineConfig {
    pub fn image_backoff(&self) -> Duration {
        Duration::from_secs(self.image_backoff_secs)
    }
}

/// Where the database and generated media live.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file. Defaults to `<data dir>/mise.db`.
    pub database: Option<PathBuf>,
    /// Directory under which `media/recipes/...` is written. Defaults to `.`.
    pub media_root: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database path. Relative paths live under the user data
    /// directory when one exists.
    pub fn database_path(&self) -> PathBuf {
        let file = self
            .database
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DATABASE_FILE));
        if file.is_absolute() {
            return file;
        }
        match crate::user_data_dir() {
            Some(dir) => dir.join(file),
            None => file,
        }
    }

    pub fn media_root(&self) -> PathBuf {
        self.media_root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Background worker pool sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum runs executing at once.
    pub concurrency: usize,
    /// Jobs that may wait in the queue before `submit` applies backpressure.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::WORKER_CONCURRENCY,
            queue_capacity: defaults::QUEUE_CAPACITY,
        }
    }
}

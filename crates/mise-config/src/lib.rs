//! Configuration system for the Mise recipe pipeline.
//!
//! Provides TOML-based configuration with:
//! - Text and image model settings (`[llm]`, `[image]`)
//! - Pipeline tuning (`[pipeline]`: retry attempts, backoff, history depth)
//! - Storage locations (`[storage]`) and worker pool sizing (`[worker]`)
//! - Config file layering (user config dir + project-local `mise.toml`)
//! - API key resolution (env var → config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options, save_config,
    user_config_dir, user_config_path, user_data_dir,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, require_api_key, resolve_api_key};
pub use types::*;

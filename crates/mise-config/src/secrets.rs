//! API key resolution.
//!
//! Resolution order:
//! 1. Environment variable (backend-specific, first non-empty wins)
//! 2. Config file (with a load-time warning)

use crate::{Backend, ConfigError, Result};

/// Result of API key resolution with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub value: String,
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve an API key for a backend from the environment, then the config.
pub fn resolve_api_key(backend: &Backend, config_value: Option<&str>) -> Option<ResolvedSecret> {
    resolve_with(backend, config_value, |var| std::env::var(var).ok())
}

/// Like [`resolve_api_key`], but a missing key is an error.
pub fn require_api_key(backend: &Backend, config_value: Option<&str>) -> Result<ResolvedSecret> {
    resolve_api_key(backend, config_value).ok_or_else(|| ConfigError::ApiKeyNotFound {
        backend: backend.to_string(),
        env_var: backend.env_vars().join(" or "),
    })
}

fn resolve_with(
    backend: &Backend,
    config_value: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<ResolvedSecret> {
    for var in backend.env_vars() {
        if let Some(value) = lookup(var)
            && !value.is_empty()
        {
            return Some(ResolvedSecret {
                value,
                source: SecretSource::EnvVar(var.to_string()),
            });
        }
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

//! Configuration loading and credential resolution
//!
//! Bootstrap settings come from a TOML file. Every field has a built-in
//! default, so a missing file is equivalent to an empty one.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (credentials only)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Primary environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "ROLLCALL_GEMINI_API_KEY";

/// Fallback environment variable (the name Google's tooling uses)
pub const API_KEY_ENV_FALLBACK: &str = "GEMINI_API_KEY";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Gemini API key (lowest-priority credential source)
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Oracle (language model) client settings
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Matching thresholds
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Oracle client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Generative model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model name (embedding selector only)
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit; the delay before retry n is `base_delay_ms * 2^n`
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            embedding_model: default_embedding_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Matching thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum rule-based score before the oracle is consulted
    #[serde(default = "default_admission_threshold")]
    pub admission_threshold: f64,

    /// Minutes of attendance required for "present"
    #[serde(default = "default_present_threshold")]
    pub present_threshold_minutes: u32,

    /// SQLite file for cached embeddings (embedding selector only)
    #[serde(default)]
    pub embedding_cache: Option<PathBuf>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            admission_threshold: default_admission_threshold(),
            present_threshold_minutes: default_present_threshold(),
            embedding_cache: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_admission_threshold() -> f64 {
    0.2
}

fn default_present_threshold() -> u32 {
    30
}

/// Default configuration file path (`<config dir>/rollcall/rollcall.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rollcall").join("rollcall.toml"))
}

/// Load TOML configuration
///
/// A missing file yields defaults; an unreadable or malformed file is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolve the Gemini API key
///
/// **Priority:** CLI → `ROLLCALL_GEMINI_API_KEY` → `GEMINI_API_KEY` → TOML
///
/// A missing credential is a configuration error and must surface before
/// any matching work starts.
pub fn resolve_api_key(cli_key: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV).ok();
    let env_fallback = std::env::var(API_KEY_ENV_FALLBACK).ok();

    let candidates: [(&str, Option<&str>); 4] = [
        ("command line", cli_key),
        ("environment", env_key.as_deref()),
        ("environment (fallback)", env_fallback.as_deref()),
        ("TOML", toml_config.gemini_api_key.as_deref()),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key))
        .map(|(source, _)| *source)
        .collect();

    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (source, key) in candidates {
        if let Some(key) = key.filter(|k| is_valid_key(k)) {
            info!("Gemini API key loaded from {}", source);
            return Ok(key.trim().to_string());
        }
    }

    Err(Error::Config(format!(
        "Gemini API key not configured. Please configure using one of:\n\
         1. Command line: --api-key <key>\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: gemini_api_key = \"your-key\"",
        API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.oracle.model, "gemini-2.5-flash");
        assert_eq!(config.oracle.max_retries, 2);
        assert_eq!(config.oracle.base_delay_ms, 1000);
        assert_eq!(config.matching.admission_threshold, 0.2);
        assert_eq!(config.matching.present_threshold_minutes, 30);
        assert!(config.matching.embedding_cache.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [oracle]
            model = "gemini-2.0-flash"

            [matching]
            present_threshold_minutes = 45
            "#,
        )
        .unwrap();

        assert_eq!(config.oracle.model, "gemini-2.0-flash");
        assert_eq!(config.oracle.temperature, 0.2);
        assert_eq!(config.matching.present_threshold_minutes, 45);
        assert_eq!(config.matching.admission_threshold, 0.2);
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   \t"));
    }
}

//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TRANSCLUDE_*)
//! 2. TOML config file (if TRANSCLUDE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TRANSCLUDE_*)
/// 2. TOML config file (if TRANSCLUDE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-Agent string for HTTP requests.
    ///
    /// Set via TRANSCLUDE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per document.
    ///
    /// Set via TRANSCLUDE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Timeout for documents fetched over the network, in milliseconds.
    ///
    /// Set via TRANSCLUDE_NETWORK_TIMEOUT_MS environment variable.
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// Timeout for documents read from `file` locations, in milliseconds.
    ///
    /// Set via TRANSCLUDE_FILE_TIMEOUT_MS environment variable.
    #[serde(default = "default_file_timeout_ms")]
    pub file_timeout_ms: u64,

    /// Maximum number of redirects to follow.
    ///
    /// Set via TRANSCLUDE_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Maximum nesting depth of imports within imports. Zero means unbounded.
    ///
    /// Set via TRANSCLUDE_MAX_DEPTH environment variable.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Whether the requester is taken to be the author of the content.
    /// Unset means: decide from the document location (local files are authored).
    ///
    /// Set via TRANSCLUDE_AUTHOR_MODE environment variable.
    #[serde(default)]
    pub author_mode: Option<bool>,

    /// Whether to run the costly check that every requested location is in normal form.
    /// Unset means: follow the author mode.
    ///
    /// Set via TRANSCLUDE_ENFORCE_CONSTRAINTS environment variable.
    #[serde(default)]
    pub enforce_constraints: Option<bool>,
}

fn default_user_agent() -> String {
    "transclude/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_network_timeout_ms() -> u64 {
    8_000
}

fn default_file_timeout_ms() -> u64 {
    2_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_depth() -> usize {
    32
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            network_timeout_ms: default_network_timeout_ms(),
            file_timeout_ms: default_file_timeout_ms(),
            max_redirects: default_max_redirects(),
            max_depth: default_max_depth(),
            author_mode: None,
            enforce_constraints: None,
        }
    }
}

impl AppConfig {
    /// Network timeout as Duration for use with reqwest/tokio.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    /// File timeout as Duration for use with tokio.
    pub fn file_timeout(&self) -> Duration {
        Duration::from_millis(self.file_timeout_ms)
    }

    /// The import depth limit, or `None` when imports may nest without bound.
    pub fn depth_limit(&self) -> Option<usize> {
        (self.max_depth > 0).then_some(self.max_depth)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TRANSCLUDE_`
    /// 2. TOML file from `TRANSCLUDE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TRANSCLUDE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TRANSCLUDE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

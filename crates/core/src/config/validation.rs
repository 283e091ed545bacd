//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn check_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value < 100 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
    }
    if value > 300_000 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must not exceed 5 minutes (300000ms)".into() });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - either timeout is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `max_redirects` exceeds 20
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        check_timeout("network_timeout_ms", self.network_timeout_ms)?;
        check_timeout("file_timeout_ms", self.file_timeout_ms)?;

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_redirects > 20 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 20".into() });
        }

        if self.depth_limit().is_none() {
            tracing::warn!("max_depth is 0; transclusion cycles will recurse without bound");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_max_bytes_exceeds_limit() {
        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() }; // 51MB
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_network_timeout_too_small() {
        let config = AppConfig { network_timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "network_timeout_ms"));
    }

    #[test]
    fn test_validate_file_timeout_exceeds_limit() {
        let config = AppConfig { file_timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "file_timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_too_many_redirects() {
        let config = AppConfig { max_redirects: 21, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_redirects"));
    }

    #[test]
    fn test_validate_unbounded_depth_allowed() {
        let config = AppConfig { max_depth: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            max_bytes: 1,
            network_timeout_ms: 100,
            file_timeout_ms: 300_000,
            max_redirects: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}

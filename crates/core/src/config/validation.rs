//! Configuration validation rules.
//!
//! Applied to `AppConfig` values after they have been loaded from
//! environment, file, or defaults.

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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` is 0 or exceeds one hour
    /// - `search_index`, `change_stream`, or `change_group` is empty
    /// - `change_block_ms` is outside 100ms..=60s
    /// - `loader_timeout_ms` is set below 10ms
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must be greater than 0".into() });
        }
        if self.cache_ttl_secs > 3_600 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must not exceed 1 hour".into() });
        }

        if self.search_index.is_empty() {
            return Err(ConfigError::Invalid { field: "search_index".into(), reason: "must not be empty".into() });
        }
        if self.change_stream.is_empty() {
            return Err(ConfigError::Invalid { field: "change_stream".into(), reason: "must not be empty".into() });
        }
        if self.change_group.is_empty() {
            return Err(ConfigError::Invalid { field: "change_group".into(), reason: "must not be empty".into() });
        }

        if self.change_block_ms < 100 {
            return Err(ConfigError::Invalid { field: "change_block_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.change_block_ms > 60_000 {
            return Err(ConfigError::Invalid { field: "change_block_ms".into(), reason: "must not exceed 60s".into() });
        }

        if let Some(timeout) = self.loader_timeout_ms
            && timeout < 10
        {
            return Err(ConfigError::Invalid {
                field: "loader_timeout_ms".into(),
                reason: "must be at least 10ms when set".into(),
            });
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
    fn test_validate_zero_ttl() {
        let config = AppConfig { cache_ttl_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));
    }

    #[test]
    fn test_validate_ttl_exceeds_limit() {
        let config = AppConfig { cache_ttl_secs: 3_601, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));
    }

    #[test]
    fn test_validate_empty_index() {
        let config = AppConfig { search_index: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "search_index"));
    }

    #[test]
    fn test_validate_block_ms_bounds() {
        let config = AppConfig { change_block_ms: 50, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { change_block_ms: 61_000, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { change_block_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_tiny_loader_timeout() {
        let config = AppConfig { loader_timeout_ms: Some(5), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "loader_timeout_ms"));
    }
}

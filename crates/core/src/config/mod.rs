//! Application configuration with layered loading.
//!
//! Loading precedence (highest wins):
//! 1. Environment variables (REVQ_*)
//! 2. TOML config file (if REVQ_CONFIG_FILE set)
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
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL, used for both the query cache and the
    /// change stream.
    ///
    /// Set via REVQ_REDIS_URL environment variable.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Search backend base URL.
    ///
    /// Set via REVQ_SEARCH_URL environment variable.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Search index holding the review replica.
    ///
    /// Set via REVQ_SEARCH_INDEX environment variable.
    #[serde(default = "default_search_index")]
    pub search_index: String,

    /// Query cache entry lifetime in seconds.
    ///
    /// Set via REVQ_CACHE_TTL_SECS environment variable. Consistency of
    /// the read path is bounded only by this window; nothing invalidates
    /// entries on write.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Optional time budget in milliseconds for the coalesced backend
    /// load. Unset means the load waits as long as the search client does.
    ///
    /// Set via REVQ_LOADER_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub loader_timeout_ms: Option<u64>,

    /// Change stream key.
    ///
    /// Set via REVQ_CHANGE_STREAM environment variable.
    #[serde(default = "default_change_stream")]
    pub change_stream: String,

    /// Consumer group name on the change stream.
    ///
    /// Set via REVQ_CHANGE_GROUP environment variable.
    #[serde(default = "default_change_group")]
    pub change_group: String,

    /// This process's consumer name within the group.
    ///
    /// Set via REVQ_CHANGE_CONSUMER environment variable.
    #[serde(default = "default_change_consumer")]
    pub change_consumer: String,

    /// How long one blocking stream read waits, in milliseconds. Bounds
    /// shutdown latency while the consumer is idle.
    ///
    /// Set via REVQ_CHANGE_BLOCK_MS environment variable.
    #[serde(default = "default_change_block_ms")]
    pub change_block_ms: u64,

    /// Search request timeout in milliseconds.
    ///
    /// Set via REVQ_SEARCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".into()
}

fn default_search_url() -> String {
    "http://127.0.0.1:9200".into()
}

fn default_search_index() -> String {
    "review".into()
}

fn default_cache_ttl_secs() -> u64 {
    20
}

fn default_change_stream() -> String {
    "review:changes".into()
}

fn default_change_group() -> String {
    "revq-indexer".into()
}

fn default_change_consumer() -> String {
    "revqd-1".into()
}

fn default_change_block_ms() -> u64 {
    5_000
}

fn default_search_timeout_ms() -> u64 {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            search_url: default_search_url(),
            search_index: default_search_index(),
            cache_ttl_secs: default_cache_ttl_secs(),
            loader_timeout_ms: None,
            change_stream: default_change_stream(),
            change_group: default_change_group(),
            change_consumer: default_change_consumer(),
            change_block_ms: default_change_block_ms(),
            search_timeout_ms: default_search_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Ok(path) = std::env::var("REVQ_CONFIG_FILE") {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("REVQ_"))
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn loader_timeout(&self) -> Option<Duration> {
        self.loader_timeout_ms.map(Duration::from_millis)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(20));
        assert_eq!(config.search_index, "review");
        assert!(config.loader_timeout().is_none());
    }

    #[test]
    fn test_loader_timeout_conversion() {
        let config = AppConfig { loader_timeout_ms: Some(250), ..Default::default() };
        assert_eq!(config.loader_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "revq.toml",
                r#"
                    cache_ttl_secs = 45
                    search_index = "review_v2"
                "#,
            )?;
            jail.set_env("REVQ_CONFIG_FILE", "revq.toml");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.cache_ttl_secs, 45);
            assert_eq!(config.search_index, "review_v2");
            assert_eq!(config.change_block_ms, 5_000);
            Ok(())
        });
    }

    #[test]
    fn test_env_layer_wins_over_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("revq.toml", "cache_ttl_secs = 45")?;
            jail.set_env("REVQ_CONFIG_FILE", "revq.toml");
            jail.set_env("REVQ_CACHE_TTL_SECS", "90");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.cache_ttl_secs, 90);
            Ok(())
        });
    }
}

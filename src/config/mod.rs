//! Gateway configuration
//!
//! Loaded once from YAML with environment overrides, validated, and then
//! served as an immutable snapshot. Updates build a whole new `Config`
//! and atomically swap it into the [`ConfigHandle`]; a live snapshot is
//! never partially mutated.

pub mod models;

pub use models::{
    AuthConfig, CorsConfig, FailoverConfig, GatewayConfig, HealthConfig, LimitsConfig,
    LoggingConfig, ProxyConfig, RouterConfig, ServerConfig,
};

use crate::core::health::HealthMonitorConfig;
use crate::core::proxy::ExecutorConfig;
use crate::core::rate_limiter::LimiterConfig;
use crate::core::router::RoutingStrategy;
use crate::utils::error::{GatewayError, Result};
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Top-level configuration
pub type Config = GatewayConfig;

impl GatewayConfig {
    /// Load from a YAML file, apply environment overrides, validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config: GatewayConfig = serde_yaml::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("failed to parse config: {}", e)))?;
        config.apply_env_overrides();
        config.validate()?;
        info!(path = %path.display(), sources = config.sources.len(), "configuration loaded");
        Ok(config)
    }

    /// Environment wins over the file for deploy-time secrets and the
    /// bind address
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("FUSION_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("FUSION_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(key) = std::env::var("FUSION_MASTER_KEY") {
            self.auth.master_key = Some(key);
        }
        if let Ok(level) = std::env::var("FUSION_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Reject configurations the request plane cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(GatewayError::Config("server.port must be non-zero".into()));
        }
        let mut ids = HashSet::new();
        for source in &self.sources {
            if source.id.is_empty() {
                return Err(GatewayError::Config("source id must not be empty".into()));
            }
            if !ids.insert(source.id.clone()) {
                return Err(GatewayError::Config(format!(
                    "duplicate source id {}",
                    source.id
                )));
            }
            url::Url::parse(&source.base_url).map_err(|e| {
                GatewayError::Config(format!(
                    "source {} has invalid base_url: {}",
                    source.id, e
                ))
            })?;
        }
        if self.health.interval_secs == 0 {
            return Err(GatewayError::Config(
                "health.interval_secs must be non-zero".into(),
            ));
        }
        if self.health.failure_threshold == 0 {
            return Err(GatewayError::Config(
                "health.failure_threshold must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Routing strategy parsed from the router section
    pub fn routing_strategy(&self) -> RoutingStrategy {
        RoutingStrategy::parse(&self.router.strategy)
    }

    /// Executor tuning derived from the failover/proxy sections
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_retries: if self.failover.enabled {
                self.failover.max_retries
            } else {
                0
            },
            request_timeout: Duration::from_secs(self.proxy.request_timeout_secs),
            failure_threshold: self.health.failure_threshold,
            retry_streams_before_first_byte: self.failover.retry_streams_before_first_byte,
        }
    }

    /// Health monitor tuning derived from the health section
    pub fn health_config(&self) -> HealthMonitorConfig {
        HealthMonitorConfig {
            enabled: self.health.enabled,
            interval: Duration::from_secs(self.health.interval_secs),
            timeout: Duration::from_secs(self.health.timeout_secs),
            failure_threshold: self.health.failure_threshold,
        }
    }

    /// Rate limiter tuning derived from the limits section
    pub fn limiter_config(&self) -> LimiterConfig {
        LimiterConfig {
            auto_ban_threshold: self.limits.auto_ban_threshold,
            auto_ban_duration: Duration::from_secs(self.limits.auto_ban_minutes * 60),
            janitor_interval: Duration::from_secs(self.limits.janitor_interval_secs),
        }
    }
}

/// Atomically swappable configuration snapshot
pub struct ConfigHandle {
    inner: ArcSwap<GatewayConfig>,
}

impl ConfigHandle {
    /// Handle over an initial snapshot
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            inner: ArcSwap::from_pointee(config),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<GatewayConfig> {
        self.inner.load_full()
    }

    /// Replace the snapshot; readers see the old or the new config,
    /// never a mix
    pub fn replace(&self, config: GatewayConfig) {
        self.inner.store(Arc::new(config));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn minimal_config_loads_with_defaults() {
        let file = write_config("server:\n  port: 8080\n");
        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.routing_strategy(), RoutingStrategy::Priority);
        assert!(config.failover.enabled);
        assert_eq!(config.executor_config().max_retries, 2);
        assert_eq!(config.health_config().failure_threshold, 3);
    }

    #[test]
    fn sources_and_strategy_parse() {
        let yaml = r#"
server:
  port: 9000
router:
  strategy: least-latency
failover:
  enabled: false
sources:
  - id: main
    name: Main
    type: openai
    base_url: https://api.openai.com
    api_key: sk-up
    priority: 1
    capabilities:
      function_calling: true
      vision: true
"#;
        let file = write_config(yaml);
        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.routing_strategy(), RoutingStrategy::LeastLatency);
        // failover disabled zeroes the retry budget
        assert_eq!(config.executor_config().max_retries, 0);
    }

    #[test]
    fn duplicate_source_ids_are_rejected() {
        let yaml = r#"
server:
  port: 9000
sources:
  - id: a
    name: A
    type: openai
    base_url: https://a.example.com
  - id: a
    name: A2
    type: custom
    base_url: https://a2.example.com
"#;
        let file = write_config(yaml);
        assert!(GatewayConfig::load(file.path()).is_err());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let yaml = r#"
server:
  port: 9000
sources:
  - id: a
    name: A
    type: openai
    base_url: not-a-url
"#;
        let file = write_config(yaml);
        assert!(GatewayConfig::load(file.path()).is_err());
    }

    #[test]
    fn handle_swaps_snapshots_atomically() {
        let handle = ConfigHandle::new(GatewayConfig::default());
        assert_eq!(handle.snapshot().server.port, 8080);

        let mut updated = GatewayConfig::default();
        updated.server.port = 9999;
        handle.replace(updated);
        assert_eq!(handle.snapshot().server.port, 9999);
    }
}

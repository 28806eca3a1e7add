//! Configuration models

use crate::core::models::Credential;
use crate::core::sources::SourceRecord;
use serde::{Deserialize, Serialize};

/// Root configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Authentication settings
    pub auth: AuthConfig,
    /// Router settings
    pub router: RouterConfig,
    /// Failover policy
    pub failover: FailoverConfig,
    /// Health monitor settings
    pub health: HealthConfig,
    /// Rate limiter defaults
    pub limits: LimitsConfig,
    /// Upstream egress settings
    pub proxy: ProxyConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Seed sources merged into the registry at startup
    pub sources: Vec<SourceRecord>,
    /// Seed credentials loaded into the store at startup
    pub credentials: Vec<Credential>,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Worker count; actix picks the core count when absent
    pub workers: Option<usize>,
    /// CORS settings
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
            cors: CorsConfig::default(),
        }
    }
}

/// CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Whether the CORS layer is mounted
    pub enabled: bool,
    /// Allowed origins; empty allows any
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: Vec::new(),
        }
    }
}

/// Authentication settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Static master key checked after the managed credentials table
    pub master_key: Option<String>,
}

/// Router settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Strategy name: priority, round-robin, weighted, least-latency,
    /// least-cost
    pub strategy: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: "priority".to_string(),
        }
    }
}

/// Failover policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Master switch; disabled means a single attempt
    pub enabled: bool,
    /// Additional attempts after the first
    pub max_retries: u32,
    /// Allow retrying a stream that has not yet sent any byte
    pub retry_streams_before_first_byte: bool,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            retry_streams_before_first_byte: true,
        }
    }
}

/// Health monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Whether the background prober runs
    pub enabled: bool,
    /// Seconds between probe passes
    pub interval_secs: u64,
    /// Per-probe timeout in seconds
    pub timeout_secs: u64,
    /// Consecutive failures before a source turns unhealthy
    pub failure_threshold: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
            timeout_secs: 10,
            failure_threshold: 3,
        }
    }
}

/// Rate limiter defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Consecutive errors before auto-ban
    pub auto_ban_threshold: u32,
    /// Auto-ban duration in minutes
    pub auto_ban_minutes: u64,
    /// Janitor pass interval in seconds
    pub janitor_interval_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            auto_ban_threshold: 50,
            auto_ban_minutes: 30,
            janitor_interval_secs: 60,
        }
    }
}

/// Upstream egress settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Per-attempt deadline for non-stream calls, seconds
    pub request_timeout_secs: u64,
    /// Connect timeout, seconds
    pub connect_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
            connect_timeout_secs: 10,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter, e.g. "info" or "fusion_gateway=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

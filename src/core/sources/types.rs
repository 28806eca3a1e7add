//! Source record, status, and capability types

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upstream provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// new-api style relay
    NewApi,
    /// Aggregator whose per-model capabilities are discovered at runtime
    Cpa,
    /// Native OpenAI endpoint
    OpenAi,
    /// Native Anthropic endpoint
    Anthropic,
    /// Any other OpenAI-compatible endpoint
    Custom,
}

impl SourceType {
    /// Whether this is an aggregator source
    pub fn is_aggregator(&self) -> bool {
        matches!(self, SourceType::Cpa)
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::NewApi => write!(f, "newapi"),
            SourceType::Cpa => write!(f, "cpa"),
            SourceType::OpenAi => write!(f, "openai"),
            SourceType::Anthropic => write!(f, "anthropic"),
            SourceType::Custom => write!(f, "custom"),
        }
    }
}

/// Declared capability set, owned by the admin CRUD path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Native tool calling
    #[serde(default)]
    pub function_calling: bool,
    /// Extended thinking
    #[serde(default)]
    pub thinking: bool,
    /// Image input
    #[serde(default)]
    pub vision: bool,
    /// Allowed model list; empty admits every model
    #[serde(default)]
    pub models: Vec<String>,
}

/// Aggregator account mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountMode {
    /// One shared upstream account
    #[default]
    Single,
    /// Per-provider upstream accounts
    Multi,
}

/// Aggregator-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Enabled sub-provider identifiers, e.g. "gemini", "claude"
    #[serde(default)]
    pub providers: Vec<String>,
    /// Account mode
    #[serde(default)]
    pub account_mode: AccountMode,
    /// Discover the model→provider map from the probe response
    #[serde(default)]
    pub auto_detect: bool,
}

impl AggregatorConfig {
    /// Whether a sub-provider is enabled by config
    pub fn provider_enabled(&self, provider: &str) -> bool {
        self.providers.iter().any(|p| p == provider)
    }
}

/// Per-provider capability bits from the fixed matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCaps {
    /// Native tool calling
    pub function_calling: bool,
    /// Image input
    pub vision: bool,
}

/// Fixed capability matrix for aggregator sub-providers.
///
/// Extended thinking is never available through an aggregator, so the
/// matrix carries no thinking bit.
pub fn provider_caps(provider: &str) -> Option<ProviderCaps> {
    match provider {
        "gemini" | "claude" | "codex" => Some(ProviderCaps {
            function_calling: true,
            vision: true,
        }),
        "qwen" => Some(ProviderCaps {
            function_calling: false,
            vision: true,
        }),
        _ => None,
    }
}

/// Liveness state of a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Serving traffic
    #[default]
    Healthy,
    /// Failed too many consecutive probes or requests
    Unhealthy,
    /// Retired by an admin; terminal
    Removed,
}

/// Runtime-detected capability record, owned by the health monitor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedCapabilities {
    /// Models discovered on the upstream
    pub models: Vec<String>,
    /// Any enabled provider supports tool calling
    pub function_calling: bool,
    /// Any enabled provider supports image input
    pub vision: bool,
}

/// Live status of a source.
///
/// Only ever read or written through the owning [`Source`]'s lock; reads
/// return a deep copy, so a caller can never retain a reference to the
/// live maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceStatus {
    /// Liveness state
    pub state: HealthState,
    /// Most recent probe or request latency, milliseconds
    pub latency_ms: u64,
    /// Last probe time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
    /// Cumulative error count
    pub error_count: u64,
    /// Consecutive failures since the last success
    pub consecutive_failures: u32,
    /// Last error message, truncated at the probe boundary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Remaining balance when the upstream reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    /// Aggregator model→provider map populated by the health monitor
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub model_providers: HashMap<String, String>,
    /// Runtime-detected capabilities for aggregator sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected: Option<DetectedCapabilities>,
}

/// Serializable source record, the wire/store form of a [`Source`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Stable identifier
    pub id: String,
    /// Human name
    pub name: String,
    /// Upstream type
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Base URL, without the /v1 suffix
    pub base_url: String,
    /// Optional bearer credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Routing priority; lower sorts earlier
    #[serde(default)]
    pub priority: i32,
    /// Routing weight, clamped to ≥1 at use
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Disabled sources never receive traffic or probes
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Declared capabilities
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Aggregator configuration, only meaningful for `cpa`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator: Option<AggregatorConfig>,
}

fn default_weight() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// One upstream provider endpoint.
///
/// Configuration fields are immutable on the live record; the admin
/// update path swaps in a whole new record while carrying the status
/// over. The status lives behind its own lock.
#[derive(Debug)]
pub struct Source {
    /// Stable identifier
    pub id: String,
    /// Human name
    pub name: String,
    /// Upstream type
    pub source_type: SourceType,
    /// Base URL, without the /v1 suffix
    pub base_url: String,
    /// Optional bearer credential
    pub api_key: Option<String>,
    /// Routing priority; lower sorts earlier
    pub priority: i32,
    /// Routing weight
    pub weight: u32,
    /// Disabled sources never receive traffic or probes
    pub enabled: bool,
    /// Declared capabilities
    pub capabilities: Capabilities,
    /// Aggregator configuration
    pub aggregator: Option<AggregatorConfig>,
    status: RwLock<SourceStatus>,
}

impl Source {
    /// Build a live source from its record form with a fresh status
    pub fn from_record(record: SourceRecord) -> Self {
        Self::with_status(record, SourceStatus::default())
    }

    /// Build a live source carrying an existing status
    pub fn with_status(record: SourceRecord, status: SourceStatus) -> Self {
        Self {
            id: record.id,
            name: record.name,
            source_type: record.source_type,
            base_url: record.base_url,
            api_key: record.api_key,
            priority: record.priority,
            weight: record.weight.max(1),
            enabled: record.enabled,
            capabilities: record.capabilities,
            aggregator: record.aggregator,
            status: RwLock::new(status),
        }
    }

    /// Record form of this source's configuration
    pub fn to_record(&self) -> SourceRecord {
        SourceRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            source_type: self.source_type,
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            priority: self.priority,
            weight: self.weight,
            enabled: self.enabled,
            capabilities: self.capabilities.clone(),
            aggregator: self.aggregator.clone(),
        }
    }

    /// Deep copy of the current status
    pub fn status(&self) -> SourceStatus {
        self.status.read().clone()
    }

    /// Mutate the status under the write lock
    pub fn update_status(&self, f: impl FnOnce(&mut SourceStatus)) {
        let mut status = self.status.write();
        f(&mut status);
    }

    /// Record a successful probe or request attempt
    pub fn mark_success(&self, latency_ms: u64) {
        let mut status = self.status.write();
        status.state = HealthState::Healthy;
        status.consecutive_failures = 0;
        status.latency_ms = latency_ms;
        status.last_check = Some(Utc::now());
        status.last_error = None;
    }

    /// Record a failed attempt; transitions to unhealthy at `threshold`
    /// consecutive failures
    pub fn mark_failure(&self, error: impl Into<String>, latency_ms: u64, threshold: u32) {
        let mut status = self.status.write();
        status.error_count += 1;
        status.consecutive_failures += 1;
        status.latency_ms = latency_ms;
        status.last_check = Some(Utc::now());
        status.last_error = Some(error.into());
        if status.consecutive_failures >= threshold && status.state == HealthState::Healthy {
            status.state = HealthState::Unhealthy;
        }
    }

    /// Whether the source is enabled and currently healthy
    pub fn is_available(&self) -> bool {
        self.enabled && self.status.read().state == HealthState::Healthy
    }

    /// Model filter: the effective allowed-model list is empty or contains
    /// the requested model.
    ///
    /// For an auto-detect aggregator the detected model list replaces the
    /// declared one once discovery has run.
    pub fn supports_model(&self, model: &str) -> bool {
        if self.source_type.is_aggregator() {
            let status = self.status.read();
            if let Some(detected) = &status.detected {
                if !detected.models.is_empty() {
                    return detected.models.iter().any(|m| m == model);
                }
            }
        }
        self.capabilities.models.is_empty() || self.capabilities.models.iter().any(|m| m == model)
    }

    /// Whether tool calling is natively available for the given model.
    ///
    /// Aggregators answer per (model, provider): the detected provider for
    /// the model must be enabled by config and carry FC in the matrix.
    /// Everything else answers from the declared bit.
    pub fn supports_fc(&self, model: &str) -> bool {
        if !self.source_type.is_aggregator() {
            return self.capabilities.function_calling;
        }
        let Some(aggregator) = &self.aggregator else {
            return false;
        };
        let status = self.status.read();
        let provider = match status.model_providers.get(model) {
            Some(p) => p.clone(),
            None => return false,
        };
        drop(status);
        aggregator.provider_enabled(&provider)
            && provider_caps(&provider).is_some_and(|c| c.function_calling)
    }

    /// Whether extended thinking is available. Never true for aggregators.
    pub fn supports_thinking(&self) -> bool {
        !self.source_type.is_aggregator() && self.capabilities.thinking
    }

    /// Whether image input is available.
    ///
    /// Aggregators answer from the declared bit like everyone else; the
    /// detected vision bit is informational status only.
    pub fn supports_vision(&self) -> bool {
        self.capabilities.vision
    }

    /// Effective model list contributed to `GET /v1/models`
    pub fn model_list(&self) -> Vec<String> {
        if self.source_type.is_aggregator() {
            let status = self.status.read();
            if let Some(detected) = &status.detected {
                if !detected.models.is_empty() {
                    return detected.models.clone();
                }
            }
        }
        self.capabilities.models.clone()
    }
}

/// Capability demand derived from one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityNeeds {
    /// Tools present on the request
    pub function_calling: bool,
    /// Enabled thinking present on the request
    pub thinking: bool,
    /// Image content present on the request
    pub vision: bool,
}

impl CapabilityNeeds {
    /// Needs with the FC demand dropped, for the degradation fallback
    pub fn without_fc(self) -> Self {
        Self {
            function_calling: false,
            ..self
        }
    }
}

//! Managed API credentials and their limits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-credential admission limits.
///
/// A zero value disables the corresponding dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyLimits {
    /// Requests per minute over a sliding window
    #[serde(default)]
    pub rpm: u32,
    /// Requests per UTC day
    #[serde(default)]
    pub daily_quota: u64,
    /// Maximum in-flight requests
    #[serde(default)]
    pub concurrent: u32,
    /// Per-tool daily quotas, keyed by detected client tool
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tool_quotas: HashMap<String, u64>,
}

/// A managed API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Stable identifier
    pub id: String,
    /// Secret value presented as the bearer token
    pub secret: String,
    /// Display name
    pub name: String,
    /// Disabled credentials are rejected at authentication
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Admission limits
    #[serde(default)]
    pub limits: KeyLimits,
    /// When non-empty, the detected client tool must appear here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last successful authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl Credential {
    /// New enabled credential with no limits
    pub fn new(id: impl Into<String>, secret: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            name: name.into(),
            enabled: true,
            limits: KeyLimits::default(),
            allowed_tools: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Whether the detected tool passes the credential's allow list.
    ///
    /// An empty or absent list allows every tool.
    pub fn tool_allowed(&self, tool: &str) -> bool {
        match &self.allowed_tools {
            Some(allowed) if !allowed.is_empty() => allowed.iter().any(|t| t == tool),
            _ => true,
        }
    }
}

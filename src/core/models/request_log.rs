//! Terminal-outcome request log row

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per terminal request outcome.
///
/// Written exactly once per request by the proxy executor, whether the
/// request succeeded, exhausted every source, or ended mid-stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLog {
    /// Request identifier (inbound X-Request-ID or generated)
    pub request_id: String,
    /// Time the row was written
    pub timestamp: DateTime<Utc>,
    /// Identifier of the source that served (or last failed) the request;
    /// empty when routing yielded nothing
    pub source_id: String,
    /// Human name of that source
    pub source_name: String,
    /// Requested model
    pub model: String,
    /// Request carried tools
    pub has_tools: bool,
    /// Request carried enabled thinking
    pub has_thinking: bool,
    /// Request asked for SSE streaming
    pub stream: bool,
    /// Terminal outcome
    pub success: bool,
    /// HTTP status returned to the client
    pub status_code: u16,
    /// Total latency of the winning (or last) attempt, milliseconds
    pub latency_ms: u64,
    /// Prompt token count when the upstream reported usage
    pub prompt_tokens: u32,
    /// Completion token count when the upstream reported usage
    pub completion_tokens: u32,
    /// Aggregate error message on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// First-tried source when more than one source was attempted
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub failover_from: String,
    /// Client IP
    pub client_ip: String,
    /// Detected client tool
    pub client_tool: String,
    /// Credential identifier; empty for master-key requests
    pub key_id: String,
    /// The function-calling compatibility layer was used
    pub fc_compat_used: bool,
}

impl RequestLog {
    /// Date key used by daily aggregation queries (UTC)
    pub fn date_key(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}

//! Per-request client identity

use serde::{Deserialize, Serialize};

/// Client identity attached to the request context after authentication.
///
/// Lives for exactly one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Credential identifier; empty when the static master key was used
    pub key_id: String,
    /// Detected client tool, e.g. "cursor" or "unknown"
    pub tool: String,
    /// Client IP address
    pub ip: String,
}

impl ClientInfo {
    /// Identity for requests authenticated with the static master key
    pub fn master(tool: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            key_id: String::new(),
            tool: tool.into(),
            ip: ip.into(),
        }
    }
}

//! Shared HTTP client construction
//!
//! Two clients with very different timeout profiles: the proxy client
//! carries long-running completion calls, the probe client is used by the
//! health monitor and admin connection tests.

use crate::utils::error::{GatewayError, Result};
use reqwest::Client;
use std::time::Duration;

/// User-Agent sent on upstream requests
pub const UPSTREAM_USER_AGENT: &str = concat!("fusion-gateway/", env!("CARGO_PKG_VERSION"));

/// Build the client used for proxied completion calls.
///
/// The overall deadline lives on the request, not the client, so that
/// streaming responses are bounded only by connect time and client-side
/// cancellation.
pub fn proxy_client(connect_timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(UPSTREAM_USER_AGENT)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to build proxy HTTP client: {}", e)))
}

/// Build the short-deadline client used for health probes.
pub fn probe_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(UPSTREAM_USER_AGENT)
        .build()
        .map_err(|e| GatewayError::Config(format!("failed to build probe HTTP client: {}", e)))
}

//! Application state shared across HTTP handlers

use crate::config::ConfigHandle;
use crate::core::health::HealthMonitor;
use crate::core::proxy::ProxyExecutor;
use crate::core::rate_limiter::RateLimiter;
use crate::core::router::Router;
use crate::core::sources::SourceRegistry;
use crate::storage::Store;
use std::sync::Arc;

/// Shared resources for request handlers.
///
/// Everything is behind an `Arc`; cloning the state is cheap and done
/// once per worker.
#[derive(Clone)]
pub struct AppState {
    /// Hot-swappable configuration snapshot
    pub config: Arc<ConfigHandle>,
    /// Upstream source catalog
    pub registry: Arc<SourceRegistry>,
    /// Source selection
    pub router: Arc<Router>,
    /// Per-credential admission
    pub limiter: Arc<RateLimiter>,
    /// Persistence
    pub store: Arc<dyn Store>,
    /// Request lifecycle executor
    pub executor: Arc<ProxyExecutor>,
    /// Background health prober
    pub health: Arc<HealthMonitor>,
}

//! Health monitor implementation
//!
//! One background task probes every enabled source each interval. The
//! task's lifetime is independent of any request context, and the
//! admin-triggered connection test runs on its own bounded client so
//! stopping the monitor never fails a user-initiated test.

use super::probe::{apply_detection, probe_source};
use crate::core::sources::{Source, SourceRegistry};
use crate::utils::error::{GatewayError, Result};
use crate::utils::net;
use arc_swap::ArcSwap;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Health monitor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthMonitorConfig {
    /// Whether the background loop runs at all
    pub enabled: bool,
    /// Interval between probe passes
    pub interval: Duration,
    /// Per-probe timeout
    pub timeout: Duration,
    /// Consecutive failures before a source turns unhealthy
    pub failure_threshold: u32,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
            failure_threshold: 3,
        }
    }
}

/// Background prober over the source registry
pub struct HealthMonitor {
    registry: Arc<SourceRegistry>,
    config: ArcSwap<HealthMonitorConfig>,
    client: ArcSwap<reqwest::Client>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Monitor over the given registry; call [`HealthMonitor::start`] to
    /// begin probing
    pub fn new(registry: Arc<SourceRegistry>, config: HealthMonitorConfig) -> Result<Arc<Self>> {
        let client = net::probe_client(config.timeout)?;
        Ok(Arc::new(Self {
            registry,
            config: ArcSwap::from_pointee(config),
            client: ArcSwap::from_pointee(client),
            task: Mutex::new(None),
        }))
    }

    /// Spawn the background loop if enabled and not already running
    pub fn start(self: &Arc<Self>) {
        let config = self.config.load();
        if !config.enabled {
            debug!("health monitor disabled, not starting");
            return;
        }
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        let monitor = Arc::clone(self);
        let interval = config.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                monitor.probe_all().await;
            }
        }));
        info!(interval_secs = interval.as_secs(), "health monitor started");
    }

    /// Abort the background loop
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("health monitor stopped");
        }
    }

    /// Apply new settings.
    ///
    /// The loop restarts only when enablement or the interval changed;
    /// timeout and threshold changes apply on the next tick.
    pub fn config_update(self: &Arc<Self>, new: HealthMonitorConfig) -> Result<()> {
        let old = self.config.load_full();
        let restart = old.enabled != new.enabled || old.interval != new.interval;
        if old.timeout != new.timeout {
            self.client.store(Arc::new(net::probe_client(new.timeout)?));
        }
        self.config.store(Arc::new(new));
        if restart {
            self.stop();
            self.start();
        }
        Ok(())
    }

    /// One probe pass over every enabled source.
    ///
    /// Exactly one upstream request per source, aggregator discovery
    /// included.
    pub async fn probe_all(&self) {
        let config = self.config.load_full();
        let client = self.client.load_full();
        let sources: Vec<Arc<Source>> = self
            .registry
            .list()
            .into_iter()
            .filter(|s| s.enabled)
            .collect();

        let probes = sources.iter().map(|source| {
            let client = Arc::clone(&client);
            let threshold = config.failure_threshold;
            async move {
                match probe_source(&client, source).await {
                    Ok(success) => {
                        apply_detection(source, &success.models);
                        source.mark_success(success.latency_ms);
                        debug!(
                            source = %source.id,
                            latency_ms = success.latency_ms,
                            models = success.models.len(),
                            "probe succeeded"
                        );
                    }
                    Err(error) => {
                        source.mark_failure(error.message.clone(), error.latency_ms, threshold);
                        warn!(
                            source = %source.id,
                            error = %error.message,
                            "probe failed"
                        );
                    }
                }
            }
        });
        join_all(probes).await;
    }

    /// Admin-triggered connection test on a fresh bounded client,
    /// independent of the monitor's lifecycle.
    ///
    /// Updates the source's status like a regular probe and returns the
    /// measured latency.
    pub async fn test_connection(&self, source: &Source, timeout: Duration) -> Result<u64> {
        let client = net::probe_client(timeout)?;
        let threshold = self.config.load().failure_threshold;
        match probe_source(&client, source).await {
            Ok(success) => {
                apply_detection(source, &success.models);
                source.mark_success(success.latency_ms);
                Ok(success.latency_ms)
            }
            Err(error) => {
                source.mark_failure(error.message.clone(), error.latency_ms, threshold);
                Err(GatewayError::Upstream(error.message))
            }
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

//! Core admission implementation

use super::types::{Admission, KeyUsage, LimiterConfig, RejectReason, ReleaseGuard};
use crate::core::models::KeyLimits;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const RPM_WINDOW: Duration = Duration::from_secs(60);

/// Tool value that never participates in per-tool quotas
const UNKNOWN_TOOL: &str = "unknown";

#[derive(Default)]
struct LimiterState {
    /// Request timestamps inside the sliding minute, per key
    rpm: HashMap<String, Vec<Instant>>,
    /// (key, date) → requests charged today
    daily: HashMap<(String, String), u64>,
    /// (key, tool, date) → requests charged today
    tool_daily: HashMap<(String, String, String), u64>,
    /// key → in-flight requests
    concurrent: HashMap<String, u32>,
    /// key → consecutive errors since last success
    errors: HashMap<String, u32>,
    /// key → ban expiry
    banned_until: HashMap<String, Instant>,
}

pub(super) struct LimiterInner {
    state: Mutex<LimiterState>,
    config: LimiterConfig,
}

impl std::fmt::Debug for LimiterInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterInner").finish_non_exhaustive()
    }
}

impl LimiterInner {
    pub(super) fn release_concurrent(&self, key_id: &str) {
        let mut state = self.state.lock();
        if let Some(count) = state.concurrent.get_mut(key_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.concurrent.remove(key_id);
            }
        }
    }
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Per-credential atomic admission
pub struct RateLimiter {
    inner: Arc<LimiterInner>,
}

impl RateLimiter {
    /// Limiter with the given tuning
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            inner: Arc::new(LimiterInner {
                state: Mutex::new(LimiterState::default()),
                config,
            }),
        }
    }

    /// Atomic admission check and accounting.
    ///
    /// Checks run in a fixed order (ban, RPM, daily quota, tool quota,
    /// concurrency) and nothing is charged until every check has passed.
    /// The returned guard must reach every exit path; it releases the
    /// concurrency slot exactly once.
    pub fn enter(&self, key_id: &str, limits: &KeyLimits, tool: &str) -> Admission {
        let now = Instant::now();
        let date = today();
        let mut state = self.inner.state.lock();

        // 1. auto-ban, clearing an expired one
        if let Some(&until) = state.banned_until.get(key_id) {
            if now < until {
                let remaining = until - now;
                return Admission::Rejected(RejectReason::AutoBanned {
                    retry_after_secs: remaining.as_secs().max(1),
                });
            }
            state.banned_until.remove(key_id);
            state.errors.remove(key_id);
            debug!(key = key_id, "auto-ban expired, counters cleared");
        }

        // 2. sliding-window RPM; purging expired stamps is not a charge
        if limits.rpm > 0 {
            let window = state.rpm.entry(key_id.to_string()).or_default();
            window.retain(|t| now.duration_since(*t) < RPM_WINDOW);
            if window.len() >= limits.rpm as usize {
                return Admission::Rejected(RejectReason::RpmExceeded);
            }
        }

        // 3. daily quota
        if limits.daily_quota > 0 {
            let used = state
                .daily
                .get(&(key_id.to_string(), date.clone()))
                .copied()
                .unwrap_or(0);
            if used >= limits.daily_quota {
                return Admission::Rejected(RejectReason::DailyQuotaExceeded);
            }
        }

        // 4. per-tool daily quota
        let tool_quota = if !tool.is_empty() && tool != UNKNOWN_TOOL {
            limits.tool_quotas.get(tool).copied()
        } else {
            None
        };
        if let Some(quota) = tool_quota {
            let used = state
                .tool_daily
                .get(&(key_id.to_string(), tool.to_string(), date.clone()))
                .copied()
                .unwrap_or(0);
            if used >= quota {
                return Admission::Rejected(RejectReason::ToolQuotaExceeded {
                    tool: tool.to_string(),
                });
            }
        }

        // 5. concurrency
        let in_flight = state.concurrent.get(key_id).copied().unwrap_or(0);
        if limits.concurrent > 0 && in_flight >= limits.concurrent {
            return Admission::Rejected(RejectReason::ConcurrencyExceeded);
        }

        // 6. all checks passed: commit accounting
        if limits.rpm > 0 {
            state.rpm.entry(key_id.to_string()).or_default().push(now);
        }
        if limits.daily_quota > 0 {
            *state.daily.entry((key_id.to_string(), date.clone())).or_insert(0) += 1;
        }
        if tool_quota.is_some() {
            *state
                .tool_daily
                .entry((key_id.to_string(), tool.to_string(), date))
                .or_insert(0) += 1;
        }
        *state.concurrent.entry(key_id.to_string()).or_insert(0) += 1;

        Admission::Admitted(ReleaseGuard::new(
            Arc::clone(&self.inner),
            key_id.to_string(),
        ))
    }

    /// Reset the consecutive-error counter after a successful request
    pub fn record_success(&self, key_id: &str) {
        self.inner.state.lock().errors.remove(key_id);
    }

    /// Count a failed request; arms an auto-ban at the threshold
    pub fn record_error(&self, key_id: &str) {
        let mut state = self.inner.state.lock();
        let errors = state.errors.entry(key_id.to_string()).or_insert(0);
        *errors += 1;
        let count = *errors;
        if count >= self.inner.config.auto_ban_threshold {
            let until = Instant::now() + self.inner.config.auto_ban_duration;
            state.banned_until.insert(key_id.to_string(), until);
            info!(
                key = key_id,
                errors = count,
                "credential auto-banned after consecutive errors"
            );
        }
    }

    /// Current accounted usage for one (key, tool) pair
    pub fn usage(&self, key_id: &str, tool: &str) -> KeyUsage {
        let now = Instant::now();
        let date = today();
        let state = self.inner.state.lock();
        KeyUsage {
            rpm_window: state
                .rpm
                .get(key_id)
                .map(|w| {
                    w.iter()
                        .filter(|t| now.duration_since(**t) < RPM_WINDOW)
                        .count()
                })
                .unwrap_or(0),
            daily: state
                .daily
                .get(&(key_id.to_string(), date.clone()))
                .copied()
                .unwrap_or(0),
            tool_daily: state
                .tool_daily
                .get(&(key_id.to_string(), tool.to_string(), date))
                .copied()
                .unwrap_or(0),
            concurrent: state.concurrent.get(key_id).copied().unwrap_or(0),
            consecutive_errors: state.errors.get(key_id).copied().unwrap_or(0),
            banned: state
                .banned_until
                .get(key_id)
                .is_some_and(|until| now < *until),
        }
    }

    /// One janitor pass: drop expired window stamps, stale daily
    /// counters, expired bans, and empty entries.
    ///
    /// Correctness never depends on this; it only bounds memory.
    pub fn prune(&self) {
        let now = Instant::now();
        let date = today();
        let mut state = self.inner.state.lock();
        state.rpm.retain(|_, window| {
            window.retain(|t| now.duration_since(*t) < RPM_WINDOW);
            !window.is_empty()
        });
        state.daily.retain(|(_, d), _| *d == date);
        state.tool_daily.retain(|(_, _, d), _| *d == date);
        state.banned_until.retain(|_, until| now < *until);
        state.concurrent.retain(|_, count| *count > 0);
    }

    /// Spawn the background janitor
    pub fn spawn_janitor(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        let interval = limiter.inner.config.janitor_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                limiter.prune();
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}

//! Rate limiter types

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::limiter::LimiterInner;

/// Limiter tuning knobs
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Consecutive errors before a credential is auto-banned
    pub auto_ban_threshold: u32,
    /// How long an auto-ban lasts
    pub auto_ban_duration: Duration,
    /// Janitor pass interval
    pub janitor_interval: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            auto_ban_threshold: 50,
            auto_ban_duration: Duration::from_secs(30 * 60),
            janitor_interval: Duration::from_secs(60),
        }
    }
}

/// Why an admission was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Credential is auto-banned; seconds until the ban lifts
    AutoBanned {
        /// Remaining ban time, whole seconds rounded up
        retry_after_secs: u64,
    },
    /// Sliding-window RPM limit reached
    RpmExceeded,
    /// Daily quota reached
    DailyQuotaExceeded,
    /// Per-tool daily quota reached
    ToolQuotaExceeded {
        /// The tool whose quota ran out
        tool: String,
    },
    /// Concurrency cap reached
    ConcurrencyExceeded,
}

impl RejectReason {
    /// Human-readable message for the client error body
    pub fn message(&self) -> String {
        match self {
            RejectReason::AutoBanned { retry_after_secs } => format!(
                "Key temporarily banned due to repeated errors, retry in {}s",
                retry_after_secs
            ),
            RejectReason::RpmExceeded => "RPM limit exceeded".to_string(),
            RejectReason::DailyQuotaExceeded => "Daily quota exceeded".to_string(),
            RejectReason::ToolQuotaExceeded { tool } => {
                format!("Tool quota exceeded for {}", tool)
            }
            RejectReason::ConcurrencyExceeded => "Concurrency limit exceeded".to_string(),
        }
    }

    /// Whether the rejection maps to 403 rather than 429
    pub fn is_ban(&self) -> bool {
        matches!(self, RejectReason::AutoBanned { .. })
    }
}

/// Outcome of an admission attempt
#[derive(Debug)]
pub enum Admission {
    /// Accounted and admitted; the guard releases the concurrency slot
    Admitted(ReleaseGuard),
    /// Rejected without touching any counter
    Rejected(RejectReason),
}

impl Admission {
    /// Whether the request was admitted
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// Releases an admitted request's concurrency slot.
///
/// `release` may be called any number of times; only the first call
/// decrements. Dropping an unreleased guard releases too, so panics and
/// client disconnects cannot leak a slot.
#[derive(Debug)]
pub struct ReleaseGuard {
    inner: Arc<LimiterInner>,
    key_id: String,
    released: AtomicBool,
}

impl ReleaseGuard {
    pub(super) fn new(inner: Arc<LimiterInner>, key_id: String) -> Self {
        Self {
            inner,
            key_id,
            released: AtomicBool::new(false),
        }
    }

    /// Release the concurrency slot; idempotent
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.inner.release_concurrent(&self.key_id);
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Point-in-time view of one credential's accounted usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyUsage {
    /// Timestamps currently inside the one-minute window
    pub rpm_window: usize,
    /// Requests charged against today's quota
    pub daily: u64,
    /// Requests charged against today's quota for the given tool
    pub tool_daily: u64,
    /// In-flight requests
    pub concurrent: u32,
    /// Consecutive errors since the last success
    pub consecutive_errors: u32,
    /// Whether an auto-ban is currently armed
    pub banned: bool,
}

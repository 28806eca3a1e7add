//! Per-credential admission control
//!
//! One mutex guards every dimension (RPM window, daily counters, per-tool
//! counters, concurrency, error/ban bookkeeping) so that admission is a
//! single atomic decision. A rejected call mutates nothing; an admitted
//! call returns an idempotent release guard that must fire exactly once
//! on every exit path, which it does by also firing on drop.

mod limiter;
mod types;


pub use limiter::RateLimiter;
pub use types::{Admission, KeyUsage, LimiterConfig, RejectReason, ReleaseGuard};

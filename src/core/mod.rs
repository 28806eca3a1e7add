//! Request-plane core
//!
//! - `models` - wire types, credentials, client info, log rows
//! - `sources` - upstream catalog and capability state
//! - `health` - background liveness and discovery prober
//! - `rate_limiter` - per-credential atomic admission
//! - `router` - capability-filtered source selection
//! - `translator` - per-upstream adaptation and FC compatibility
//! - `streaming` - SSE types and the byte pump
//! - `proxy` - the request lifecycle executor
//! - `tool_detector` - header→client-tool mapping

pub mod health;
pub mod models;
pub mod proxy;
pub mod rate_limiter;
pub mod router;
pub mod sources;
pub mod streaming;
pub mod tool_detector;
pub mod translator;

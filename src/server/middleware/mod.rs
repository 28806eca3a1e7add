//! Actix middleware
//!
//! - `request_id` - correlate every request, echoing `X-Request-ID`
//! - `auth` - bearer authentication plus rate-limit admission, run
//!   before any handler so the concurrency cap cannot be bypassed

pub mod auth;
pub mod request_id;

pub use auth::AuthMiddleware;
pub use request_id::{RequestId, RequestIdMiddleware};

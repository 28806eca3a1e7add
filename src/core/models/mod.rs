//! Data models shared across the request plane
//!
//! - `openai` - OpenAI-compatible wire structures
//! - `client` - per-request client identity attached by auth
//! - `request_log` - the terminal-outcome log row

pub mod client;
pub mod credential;
pub mod openai;
pub mod request_log;

pub use client::ClientInfo;
pub use credential::{Credential, KeyLimits};
pub use request_log::RequestLog;

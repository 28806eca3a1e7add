//! Shared utilities: error types, logging setup, HTTP clients

pub mod error;
pub mod logging;
pub mod net;
pub mod validation;

pub use error::{GatewayError, Result};

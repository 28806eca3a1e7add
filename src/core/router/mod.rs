//! Capability-filtered, strategy-driven upstream selection
//!
//! The router filters the registry by the request's capability demand,
//! applies the failover exclusion set, and picks one source according to
//! the active strategy. When a tools-bearing request finds no native-FC
//! candidate, the demand is retried without FC so the compatibility
//! layer can bridge the semantics.

mod router;
mod strategy;

#[cfg(test)]
mod tests;

pub use router::Router;
pub use strategy::RoutingStrategy;

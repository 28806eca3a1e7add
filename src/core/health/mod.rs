//! Background health subsystem
//!
//! A periodic prober maintains each source's liveness, latency, and, for
//! aggregator sources, the runtime-detected model→provider view. Probe
//! failures never surface to clients; they only drive the per-source
//! state machine.

mod monitor;
mod probe;

#[cfg(test)]
mod tests;

pub use monitor::{HealthMonitor, HealthMonitorConfig};
pub use probe::{apply_detection, probe_source, ProbeError, ProbeSuccess};

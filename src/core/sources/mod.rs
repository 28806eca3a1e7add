//! Upstream source records and the thread-safe registry
//!
//! A source's declared capabilities belong to the admin path; detected
//! capabilities and the model→provider map belong to the health monitor.
//! Routing reads detected-first-declared-second through the accessors on
//! [`Source`].

pub mod registry;
pub mod types;

pub use registry::SourceRegistry;
pub use types::{
    provider_caps, AccountMode, AggregatorConfig, Capabilities, CapabilityNeeds,
    DetectedCapabilities, HealthState, ProviderCaps, Source, SourceRecord, SourceStatus,
    SourceType,
};

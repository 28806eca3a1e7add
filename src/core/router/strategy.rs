//! Routing strategy definitions

use serde::{Deserialize, Serialize};

/// Source selection strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    /// Lower priority value wins; round-robin within the tied top band
    #[default]
    Priority,
    /// Rotate through the pool with a shared atomic index
    RoundRobin,
    /// Weighted rotation proportional to source weights
    Weighted,
    /// Lowest recorded latency wins
    LeastLatency,
    /// Highest remaining balance wins
    LeastCost,
}

impl RoutingStrategy {
    /// Parse a config string, falling back to priority for unknown values
    pub fn parse(value: &str) -> Self {
        match value {
            "round-robin" | "round_robin" => RoutingStrategy::RoundRobin,
            "weighted" => RoutingStrategy::Weighted,
            "least-latency" | "least_latency" => RoutingStrategy::LeastLatency,
            "least-cost" | "least_cost" => RoutingStrategy::LeastCost,
            _ => RoutingStrategy::Priority,
        }
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoutingStrategy::Priority => "priority",
            RoutingStrategy::RoundRobin => "round-robin",
            RoutingStrategy::Weighted => "weighted",
            RoutingStrategy::LeastLatency => "least-latency",
            RoutingStrategy::LeastCost => "least-cost",
        };
        write!(f, "{}", name)
    }
}

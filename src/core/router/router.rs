//! Router implementation

use super::strategy::RoutingStrategy;
use crate::core::models::openai::ChatCompletionRequest;
use crate::core::sources::{CapabilityNeeds, Source, SourceRegistry};
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Strategy-driven source selection over the registry
pub struct Router {
    registry: Arc<SourceRegistry>,
    strategy: ArcSwap<RoutingStrategy>,
    rr_counter: AtomicU64,
}

impl Router {
    /// Router over the given registry
    pub fn new(registry: Arc<SourceRegistry>, strategy: RoutingStrategy) -> Self {
        Self {
            registry,
            strategy: ArcSwap::from_pointee(strategy),
            rr_counter: AtomicU64::new(0),
        }
    }

    /// Currently active strategy
    pub fn strategy(&self) -> RoutingStrategy {
        **self.strategy.load()
    }

    /// Swap the active strategy; takes effect on the next route call
    pub fn set_strategy(&self, strategy: RoutingStrategy) {
        self.strategy.store(Arc::new(strategy));
        debug!(strategy = %strategy, "routing strategy updated");
    }

    /// Pick a source for the request, skipping the exclusion set.
    ///
    /// When the request demands FC and no native-FC candidate exists, the
    /// demand is retried without FC; the translator's compatibility layer
    /// bridges tool semantics on whatever source comes back.
    pub fn route(
        &self,
        req: &ChatCompletionRequest,
        exclude: &HashSet<String>,
    ) -> Option<Arc<Source>> {
        let needs = CapabilityNeeds {
            function_calling: req.has_tools(),
            thinking: req.has_thinking(),
            vision: req.has_vision(),
        };

        let mut degraded = false;
        let mut pool = self.registry.by_capability(needs, &req.model);
        if needs.function_calling && pool.is_empty() {
            pool = self.registry.by_capability(needs.without_fc(), &req.model);
            degraded = true;
        }

        pool.retain(|s| !exclude.contains(&s.id));
        if needs.function_calling && !degraded && pool.is_empty() {
            pool = self.registry.by_capability(needs.without_fc(), &req.model);
            pool.retain(|s| !exclude.contains(&s.id));
        }

        if pool.is_empty() {
            debug!(model = %req.model, "no available source for request");
            return None;
        }

        // deterministic base ordering before any strategy tiebreak
        pool.sort_by(|a, b| a.id.cmp(&b.id));
        Some(self.apply_strategy(pool))
    }

    fn apply_strategy(&self, pool: Vec<Arc<Source>>) -> Arc<Source> {
        if pool.len() == 1 {
            return pool.into_iter().next().expect("pool checked non-empty");
        }
        match self.strategy() {
            RoutingStrategy::Priority => self.pick_priority(pool),
            RoutingStrategy::RoundRobin => {
                let idx = self.next_index(pool.len() as u64) as usize;
                pool[idx].clone()
            }
            RoutingStrategy::Weighted => self.pick_weighted(pool),
            RoutingStrategy::LeastLatency => pool
                .iter()
                .min_by_key(|s| s.status().latency_ms)
                .cloned()
                .expect("pool checked non-empty"),
            RoutingStrategy::LeastCost => pool
                .iter()
                .max_by(|a, b| {
                    let a_balance = a.status().balance.unwrap_or(0.0);
                    let b_balance = b.status().balance.unwrap_or(0.0);
                    a_balance
                        .partial_cmp(&b_balance)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .cloned()
                .expect("pool checked non-empty"),
        }
    }

    /// Lowest priority value wins; ties inside the top band rotate
    fn pick_priority(&self, mut pool: Vec<Arc<Source>>) -> Arc<Source> {
        pool.sort_by_key(|s| s.priority);
        let top = pool[0].priority;
        let band: Vec<Arc<Source>> = pool.into_iter().take_while(|s| s.priority == top).collect();
        let idx = self.next_index(band.len() as u64) as usize;
        band[idx].clone()
    }

    /// Monotonic counter modulo the weight sum picks the owning bucket
    fn pick_weighted(&self, pool: Vec<Arc<Source>>) -> Arc<Source> {
        let total: u64 = pool.iter().map(|s| u64::from(s.weight.max(1))).sum();
        let mut offset = self.rr_counter.fetch_add(1, Ordering::Relaxed) % total;
        for source in &pool {
            let weight = u64::from(source.weight.max(1));
            if offset < weight {
                return source.clone();
            }
            offset -= weight;
        }
        pool.last().expect("pool checked non-empty").clone()
    }

    fn next_index(&self, len: u64) -> u64 {
        self.rr_counter.fetch_add(1, Ordering::Relaxed) % len
    }
}

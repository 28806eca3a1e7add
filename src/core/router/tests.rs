//! Router tests

use super::router::Router;
use super::strategy::RoutingStrategy;
use crate::core::models::openai::tools::{Function, Tool};
use crate::core::models::openai::{ChatCompletionRequest, ChatMessage, MessageRole};
use crate::core::sources::{Capabilities, SourceRecord, SourceRegistry, SourceType};
use crate::storage::MemoryStore;
use std::collections::HashSet;
use std::sync::Arc;

fn record(id: &str, priority: i32, fc: bool) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        name: id.to_uppercase(),
        source_type: SourceType::OpenAi,
        base_url: format!("https://{}.example.com", id),
        api_key: None,
        priority,
        weight: 1,
        enabled: true,
        capabilities: Capabilities {
            function_calling: fc,
            thinking: false,
            vision: false,
            models: vec![],
        },
        aggregator: None,
    }
}

fn setup(records: Vec<SourceRecord>, strategy: RoutingStrategy) -> (Arc<SourceRegistry>, Router) {
    let registry = Arc::new(SourceRegistry::new(Arc::new(MemoryStore::new())));
    registry.load_from_config(records);
    let router = Router::new(Arc::clone(&registry), strategy);
    (registry, router)
}

fn request(model: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::text(MessageRole::User, "hi")],
        ..Default::default()
    }
}

fn tools_request(model: &str) -> ChatCompletionRequest {
    let mut req = request(model);
    req.tools = Some(vec![Tool::function(Function {
        name: "get_weather".to_string(),
        description: None,
        parameters: None,
    })]);
    req
}

#[test]
fn priority_prefers_lower_value() {
    let (_, router) = setup(
        vec![record("b", 2, true), record("a", 1, true)],
        RoutingStrategy::Priority,
    );
    let picked = router.route(&request("gpt-4"), &HashSet::new()).unwrap();
    assert_eq!(picked.id, "a");
}

#[test]
fn priority_ties_rotate_within_top_band() {
    let (_, router) = setup(
        vec![record("a", 1, true), record("b", 1, true), record("c", 2, true)],
        RoutingStrategy::Priority,
    );
    let mut seen = HashSet::new();
    for _ in 0..4 {
        let picked = router.route(&request("gpt-4"), &HashSet::new()).unwrap();
        assert_ne!(picked.id, "c");
        seen.insert(picked.id.clone());
    }
    assert_eq!(seen.len(), 2);
}

#[test]
fn round_robin_cycles_the_pool() {
    let (_, router) = setup(
        vec![record("a", 1, true), record("b", 1, true)],
        RoutingStrategy::RoundRobin,
    );
    let first = router.route(&request("gpt-4"), &HashSet::new()).unwrap();
    let second = router.route(&request("gpt-4"), &HashSet::new()).unwrap();
    assert_ne!(first.id, second.id);
}

#[test]
fn weighted_follows_weight_share() {
    let mut heavy = record("heavy", 1, true);
    heavy.weight = 3;
    let (_, router) = setup(vec![heavy, record("light", 1, true)], RoutingStrategy::Weighted);

    let mut heavy_hits = 0;
    for _ in 0..8 {
        if router.route(&request("gpt-4"), &HashSet::new()).unwrap().id == "heavy" {
            heavy_hits += 1;
        }
    }
    assert_eq!(heavy_hits, 6);
}

#[test]
fn least_latency_picks_fastest() {
    let (registry, router) = setup(
        vec![record("slow", 1, true), record("fast", 1, true)],
        RoutingStrategy::LeastLatency,
    );
    registry.get("slow").unwrap().mark_success(800);
    registry.get("fast").unwrap().mark_success(40);

    let picked = router.route(&request("gpt-4"), &HashSet::new()).unwrap();
    assert_eq!(picked.id, "fast");
}

#[test]
fn least_cost_picks_highest_balance() {
    let (registry, router) = setup(
        vec![record("rich", 1, true), record("poor", 1, true)],
        RoutingStrategy::LeastCost,
    );
    registry.get("rich").unwrap().update_status(|s| s.balance = Some(90.0));
    registry.get("poor").unwrap().update_status(|s| s.balance = Some(2.5));

    let picked = router.route(&request("gpt-4"), &HashSet::new()).unwrap();
    assert_eq!(picked.id, "rich");
}

#[test]
fn fc_demand_degrades_to_non_fc_pool() {
    let (_, router) = setup(vec![record("plain", 1, false)], RoutingStrategy::Priority);
    // no FC source exists, so the demand is widened for the compat layer
    let picked = router.route(&tools_request("gpt-4"), &HashSet::new()).unwrap();
    assert_eq!(picked.id, "plain");
    assert!(!picked.capabilities.function_calling);
}

#[test]
fn fc_degradation_repeats_under_exclusion() {
    let (_, router) = setup(
        vec![record("fc", 1, true), record("plain", 2, false)],
        RoutingStrategy::Priority,
    );
    let picked = router.route(&tools_request("gpt-4"), &HashSet::new()).unwrap();
    assert_eq!(picked.id, "fc");

    // with the FC source already tried, degradation widens to the plain one
    let exclude: HashSet<String> = ["fc".to_string()].into();
    let fallback = router.route(&tools_request("gpt-4"), &exclude).unwrap();
    assert_eq!(fallback.id, "plain");
}

#[test]
fn model_filter_is_never_degraded_away() {
    let mut other = record("other", 1, false);
    other.capabilities.models = vec!["claude-3".to_string()];
    let (_, router) = setup(vec![other], RoutingStrategy::Priority);

    assert!(router.route(&tools_request("gpt-4"), &HashSet::new()).is_none());
}

#[test]
fn exhausted_pool_returns_none() {
    let (_, router) = setup(vec![record("a", 1, true)], RoutingStrategy::Priority);
    let exclude: HashSet<String> = ["a".to_string()].into();
    assert!(router.route(&request("gpt-4"), &exclude).is_none());
}

#[test]
fn unhealthy_sources_are_skipped() {
    let (registry, router) = setup(
        vec![record("a", 1, true), record("b", 2, true)],
        RoutingStrategy::Priority,
    );
    registry.get("a").unwrap().mark_failure("down", 5, 1);

    let picked = router.route(&request("gpt-4"), &HashSet::new()).unwrap();
    assert_eq!(picked.id, "b");
}

#[test]
fn strategy_is_hot_swappable() {
    let (_, router) = setup(
        vec![record("a", 1, true), record("b", 2, true)],
        RoutingStrategy::Priority,
    );
    assert_eq!(router.strategy(), RoutingStrategy::Priority);
    router.set_strategy(RoutingStrategy::RoundRobin);
    assert_eq!(router.strategy(), RoutingStrategy::RoundRobin);
}

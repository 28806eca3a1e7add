//! Health monitor tests (wiremock-backed)

use super::monitor::{HealthMonitor, HealthMonitorConfig};
use super::probe::truncate;
use crate::core::proxy::upstream::MAX_ERROR_BODY;
use crate::core::sources::{
    AggregatorConfig, Capabilities, HealthState, SourceRecord, SourceRegistry, SourceType,
};
use crate::storage::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(id: &str, base_url: &str, source_type: SourceType) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        name: id.to_uppercase(),
        source_type,
        base_url: base_url.to_string(),
        api_key: Some("sk-upstream".to_string()),
        priority: 1,
        weight: 1,
        enabled: true,
        capabilities: Capabilities::default(),
        aggregator: None,
    }
}

fn monitor_config() -> HealthMonitorConfig {
    HealthMonitorConfig {
        enabled: false, // tests drive probe passes by hand
        interval: Duration::from_secs(60),
        timeout: Duration::from_secs(2),
        failure_threshold: 3,
    }
}

fn setup(records: Vec<SourceRecord>) -> (Arc<SourceRegistry>, Arc<HealthMonitor>) {
    let registry = Arc::new(SourceRegistry::new(Arc::new(MemoryStore::new())));
    registry.load_from_config(records);
    let monitor = HealthMonitor::new(Arc::clone(&registry), monitor_config()).unwrap();
    (registry, monitor)
}

#[tokio::test]
async fn successful_probe_records_latency_and_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-upstream"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [{"id": "gpt-4", "owned_by": "openai"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (registry, monitor) = setup(vec![record("a", &server.uri(), SourceType::OpenAi)]);
    monitor.probe_all().await;

    let status = registry.get("a").unwrap().status();
    assert_eq!(status.state, HealthState::Healthy);
    assert!(status.last_check.is_some());
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn failure_threshold_flips_state_and_recovery_resets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let (registry, monitor) = setup(vec![record("a", &server.uri(), SourceType::OpenAi)]);

    monitor.probe_all().await;
    monitor.probe_all().await;
    assert_eq!(registry.get("a").unwrap().status().state, HealthState::Healthy);

    monitor.probe_all().await;
    let status = registry.get("a").unwrap().status();
    assert_eq!(status.state, HealthState::Unhealthy);
    assert_eq!(status.consecutive_failures, 3);
    assert!(status.last_error.as_deref().unwrap().contains("HTTP 500"));

    // one success brings it back
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(&server)
        .await;

    monitor.probe_all().await;
    let status = registry.get("a").unwrap().status();
    assert_eq!(status.state, HealthState::Healthy);
    assert_eq!(status.consecutive_failures, 0);
}

#[tokio::test]
async fn anthropic_probe_uses_api_key_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("x-api-key", "sk-upstream"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (registry, monitor) = setup(vec![record("ant", &server.uri(), SourceType::Anthropic)]);
    monitor.probe_all().await;
    assert_eq!(registry.get("ant").unwrap().status().state, HealthState::Healthy);
}

#[tokio::test]
async fn aggregator_auto_detect_builds_provider_view() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"id": "gemini-2.0-flash", "provider": "gemini"},
                {"id": "claude-3.5-sonnet", "provider": "claude"},
                {"id": "qwen-72b", "provider": "qwen"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut agg = record("agg", &server.uri(), SourceType::Cpa);
    agg.aggregator = Some(AggregatorConfig {
        providers: vec!["gemini".to_string(), "claude".to_string()],
        auto_detect: true,
        ..Default::default()
    });
    let (registry, monitor) = setup(vec![agg]);
    monitor.probe_all().await;

    let source = registry.get("agg").unwrap();
    let status = source.status();
    assert_eq!(status.state, HealthState::Healthy);

    let detected = status.detected.as_ref().unwrap();
    // qwen is not enabled, so its pair is dropped
    assert_eq!(detected.models.len(), 2);
    assert!(detected.function_calling);
    assert!(detected.vision);
    assert_eq!(status.model_providers.len(), 2);
    assert_eq!(status.model_providers["gemini-2.0-flash"], "gemini");

    assert!(source.supports_fc("gemini-2.0-flash"));
    assert!(!source.supports_model("qwen-72b"));
    assert!(!source.supports_thinking());
}

#[tokio::test]
async fn cpa_without_credential_probes_anonymously() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut agg = record("agg", &server.uri(), SourceType::Cpa);
    agg.api_key = Some(String::new());
    agg.aggregator = Some(AggregatorConfig::default());
    let (_, monitor) = setup(vec![agg]);
    monitor.probe_all().await;

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn disabled_sources_are_not_probed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let mut off = record("off", &server.uri(), SourceType::OpenAi);
    off.enabled = false;
    let (_, monitor) = setup(vec![off]);
    monitor.probe_all().await;
}

#[tokio::test]
async fn test_connection_works_while_monitor_is_stopped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(&server)
        .await;

    let (registry, monitor) = setup(vec![record("a", &server.uri(), SourceType::OpenAi)]);
    monitor.stop();

    let source = registry.get("a").unwrap();
    let latency = monitor
        .test_connection(&source, Duration::from_secs(2))
        .await
        .unwrap();
    assert!(latency < 2_000);
    assert_eq!(source.status().state, HealthState::Healthy);
}

#[test]
fn error_bodies_are_truncated() {
    let long = "x".repeat(5 * MAX_ERROR_BODY);
    assert_eq!(truncate(&long).len(), MAX_ERROR_BODY);
    assert_eq!(truncate("short"), "short");
}

#[test]
fn config_update_only_restarts_on_enable_or_interval_change() {
    // pure comparison logic; the restart path itself needs a runtime
    let a = HealthMonitorConfig::default();
    let mut b = a.clone();
    b.failure_threshold = 9;
    assert!(a.enabled == b.enabled && a.interval == b.interval);

    b.interval = Duration::from_secs(5);
    assert!(a.interval != b.interval);
}

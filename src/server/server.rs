//! HTTP server construction and wiring

use crate::config::{Config, ConfigHandle};
use crate::core::health::HealthMonitor;
use crate::core::proxy::ProxyExecutor;
use crate::core::rate_limiter::RateLimiter;
use crate::core::router::Router;
use crate::core::sources::SourceRegistry;
use crate::server::middleware::{AuthMiddleware, RequestIdMiddleware};
use crate::server::routes;
use crate::server::state::AppState;
use crate::storage::{MemoryStore, Store};
use crate::utils::error::{GatewayError, Result};
use crate::utils::net;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_actix_web::TracingLogger;

/// Assemble the request-plane collaborators from a validated config
pub async fn build_state(config: Config) -> Result<AppState> {
    let store = Arc::new(MemoryStore::new());
    for credential in &config.credentials {
        store.insert_credential(credential.clone());
    }
    let store: Arc<dyn Store> = store;

    let registry = Arc::new(SourceRegistry::new(Arc::clone(&store)));
    registry.load().await?;
    registry.load_from_config(config.sources.clone());

    let router = Arc::new(Router::new(Arc::clone(&registry), config.routing_strategy()));
    let limiter = Arc::new(RateLimiter::new(config.limiter_config()));
    let client = net::proxy_client(Duration::from_secs(config.proxy.connect_timeout_secs))?;
    let executor = Arc::new(ProxyExecutor::new(
        Arc::clone(&router),
        Arc::clone(&limiter),
        Arc::clone(&store),
        client,
        config.executor_config(),
    ));
    let health = HealthMonitor::new(Arc::clone(&registry), config.health_config())?;

    Ok(AppState {
        config: Arc::new(ConfigHandle::new(config)),
        registry,
        router,
        limiter,
        store,
        executor,
        health,
    })
}

/// Mount the proxy-plane routes: the open liveness endpoint and the
/// auth-guarded /v1 scope
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(routes::health::health_check))
        .service(
            web::scope("/v1")
                .wrap(AuthMiddleware)
                .route(
                    "/chat/completions",
                    web::post().to(routes::chat::chat_completions),
                )
                .route("/models", web::get().to(routes::models::list_models)),
        );
}

/// Run the gateway until shutdown
pub async fn run(config: Config) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let workers = config.server.workers;
    let cors_config = config.server.cors.clone();

    let state = build_state(config).await?;
    state.health.start();
    let janitor = state.limiter.spawn_janitor();

    let app_state = web::Data::new(state.clone());
    let mut server = HttpServer::new(move || {
        let cors = if cors_config.enabled {
            if cors_config.allowed_origins.is_empty() {
                Cors::permissive()
            } else {
                let mut cors = Cors::default()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600);
                for origin in &cors_config.allowed_origins {
                    cors = cors.allowed_origin(origin);
                }
                cors
            }
        } else {
            Cors::default()
        };

        // malformed JSON still gets the uniform error body
        let json_config = web::JsonConfig::default().error_handler(|err, _| {
            GatewayError::Validation(err.to_string()).into()
        });

        App::new()
            .app_data(app_state.clone())
            .app_data(json_config)
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .configure(configure_routes)
    });
    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    info!(host = %host, port, "gateway listening");
    let result = server
        .bind((host.as_str(), port))
        .map_err(|e| GatewayError::Config(format!("failed to bind {}:{}: {}", host, port, e)))?
        .run()
        .await;

    state.health.stop();
    janitor.abort();
    result.map_err(GatewayError::from)
}

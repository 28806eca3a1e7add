//! Process liveness endpoint

use crate::server::state::AppState;
use actix_web::{web, HttpResponse};

/// `GET /health`
///
/// Unauthenticated liveness check with a coarse view of the upstream
/// pool.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let total = state.registry.list().len();
    let healthy = state.registry.healthy().len();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sources": { "healthy": healthy, "total": total },
    }))
}

//! Models listing endpoint

use crate::core::models::openai::{Model, ModelListResponse};
use crate::server::state::AppState;
use actix_web::{web, HttpResponse};

/// `GET /v1/models`
///
/// Union of the model identifiers contributed by healthy sources'
/// declared or detected lists.
pub async fn list_models(state: web::Data<AppState>) -> HttpResponse {
    let models: Vec<Model> = state
        .registry
        .healthy_models()
        .into_iter()
        .map(|id| Model::new(id, "fusion-gateway"))
        .collect();
    HttpResponse::Ok().json(ModelListResponse::new(models))
}

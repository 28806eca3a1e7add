//! Chat completions endpoint

use crate::core::models::openai::ChatCompletionRequest;
use crate::core::models::ClientInfo;
use crate::core::proxy::RequestContext;
use crate::core::rate_limiter::ReleaseGuard;
use crate::server::middleware::RequestId;
use crate::server::state::AppState;
use crate::utils::error::ErrorResponse;
use crate::utils::validation::RequestValidator;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, ResponseError};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{error, info};
use uuid::Uuid;

/// `POST /v1/chat/completions`
///
/// OpenAI-compatible chat completions, streaming and non-streaming. The
/// auth middleware has already attached identity and taken the
/// admission slot; this handler validates the body and hands off to the
/// executor.
pub async fn chat_completions(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ChatCompletionRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    if let Err(e) = RequestValidator::validate_chat_completion(&body) {
        return e.error_response();
    }

    let client = req
        .extensions()
        .get::<ClientInfo>()
        .cloned()
        .unwrap_or_default();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let guard = req.extensions_mut().remove::<ReleaseGuard>();

    info!(
        request_id = %request_id,
        model = %body.model,
        stream = body.is_stream(),
        tools = body.has_tools(),
        tool = %client.tool,
        "chat completion request"
    );

    let ctx = RequestContext {
        client,
        request_id: request_id.clone(),
        guard,
    };

    // recover panics at the HTTP boundary; the admission guard is inside
    // the future's state and still releases when it unwinds
    match AssertUnwindSafe(state.executor.execute(body, ctx))
        .catch_unwind()
        .await
    {
        Ok(response) => response,
        Err(_) => {
            error!(request_id = %request_id, "handler panicked");
            HttpResponse::InternalServerError().json(ErrorResponse::new(
                "internal error",
                "server_error",
                "internal_error",
            ))
        }
    }
}

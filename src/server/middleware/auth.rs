//! Authentication and admission middleware
//!
//! Runs before any proxy-plane handler: resolves the bearer token
//! against the managed credentials and then the static master key,
//! detects the client tool, enforces the tool allow list, and performs
//! the rate-limit admission. The admitted request carries its
//! [`ClientInfo`] and the concurrency [`ReleaseGuard`] in the request
//! extensions; the guard fires on drop, so any exit path releases the
//! slot.

use crate::core::models::{ClientInfo, Credential};
use crate::core::rate_limiter::Admission;
use crate::core::tool_detector::detect_tool;
use crate::server::state::AppState;
use crate::utils::error::GatewayError;
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, HttpMessage, ResponseError};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use tracing::{debug, warn};

/// Auth middleware for actix-web
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

/// Service implementation for the auth middleware
pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            match authenticate(&req).await {
                Ok(()) => service.call(req).await.map(|res| res.map_into_left_body()),
                Err(e) => {
                    let response = e.error_response().map_into_right_body();
                    Ok(req.into_response(response))
                }
            }
        })
    }
}

/// Resolve identity and perform admission; attaches [`ClientInfo`] and
/// the release guard to the request on success.
async fn authenticate(req: &ServiceRequest) -> Result<(), GatewayError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| GatewayError::internal("application state missing"))?
        .clone();

    let token = bearer_token(req)
        .ok_or_else(|| GatewayError::auth("missing or malformed Authorization header"))?;

    let tool = detect_tool(
        header_str(req, "x-client-name").as_deref(),
        header_str(req, "user-agent").as_deref(),
    );
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    // managed credentials win over the static master key
    let credential = state.store.credential_by_secret(&token).await?;
    match credential {
        Some(credential) => {
            admit_credential(&state, req, credential, tool, ip).await
        }
        None => {
            let config = state.config.snapshot();
            match &config.auth.master_key {
                Some(master) if *master == token => {
                    debug!(tool = %tool, "master key authenticated");
                    req.extensions_mut().insert(ClientInfo::master(tool, ip));
                    Ok(())
                }
                _ => Err(GatewayError::auth("invalid API key")),
            }
        }
    }
}

async fn admit_credential(
    state: &web::Data<AppState>,
    req: &ServiceRequest,
    credential: Credential,
    tool: String,
    ip: String,
) -> Result<(), GatewayError> {
    if !credential.enabled {
        return Err(GatewayError::KeyDisabled);
    }
    if !credential.tool_allowed(&tool) {
        warn!(key = %credential.id, tool = %tool, "tool not on allow list");
        return Err(GatewayError::ToolNotAllowed(tool));
    }

    match state.limiter.enter(&credential.id, &credential.limits, &tool) {
        Admission::Admitted(guard) => {
            let client = ClientInfo {
                key_id: credential.id.clone(),
                tool,
                ip,
            };
            req.extensions_mut().insert(client);
            req.extensions_mut().insert(guard);

            // last-used bookkeeping off the request path
            let store = state.store.clone();
            let key_id = credential.id;
            tokio::spawn(async move {
                let _ = store.touch_credential(&key_id).await;
            });
            Ok(())
        }
        Admission::Rejected(reason) => {
            warn!(key = %credential.id, reason = %reason.message(), "admission rejected");
            if reason.is_ban() {
                Err(GatewayError::KeyAutoBanned(reason.message()))
            } else {
                Err(GatewayError::RateLimited(reason.message()))
            }
        }
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn header_str(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

//! Error types for the gateway
//!
//! Every client-visible failure is rendered as the uniform OpenAI-style
//! body `{"error":{"message","type","code","param"?}}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Missing or invalid API key
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Credential exists but is disabled
    #[error("API key is disabled")]
    KeyDisabled,

    /// Detected client tool is not on the credential's allow list
    #[error("Tool not allowed: {0}")]
    ToolNotAllowed(String),

    /// Credential suspended after too many consecutive errors
    #[error("API key temporarily banned: {0}")]
    KeyAutoBanned(String),

    /// Rate limit rejection from the admission path
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// No candidate upstream after capability filtering and failover
    #[error("All sources failed: {0}")]
    AllSourcesFailed(String),

    /// Per-attempt upstream transport or HTTP failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Create an internal error from any displayable value
    pub fn internal(msg: impl Into<String>) -> Self {
        GatewayError::Internal(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        GatewayError::Auth(msg.into())
    }

    /// Machine-readable error code used in the response body
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Auth(_) => "invalid_api_key",
            GatewayError::KeyDisabled => "key_disabled",
            GatewayError::ToolNotAllowed(_) => "tool_not_allowed",
            GatewayError::KeyAutoBanned(_) => "key_auto_banned",
            GatewayError::RateLimited(_) => "rate_limit_exceeded",
            GatewayError::Validation(_) => "invalid_request_error",
            GatewayError::AllSourcesFailed(_) => "all_sources_failed",
            GatewayError::Upstream(_) => "upstream_error",
            _ => "internal_error",
        }
    }

    /// Error type string used in the response body
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::Auth(_) => "authentication_error",
            GatewayError::KeyDisabled
            | GatewayError::ToolNotAllowed(_)
            | GatewayError::KeyAutoBanned(_) => "permission_error",
            GatewayError::RateLimited(_) => "rate_limit_error",
            GatewayError::Validation(_) => "invalid_request_error",
            _ => "server_error",
        }
    }
}

/// Standard error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorDetail,
}

/// Error detail inside the standard body
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Error category, e.g. `rate_limit_error`
    #[serde(rename = "type")]
    pub error_type: String,
    /// Machine-readable code, e.g. `rate_limit_exceeded`
    pub code: String,
    /// Offending parameter, when one can be named
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl ErrorResponse {
    /// Build the uniform body from message/type/code parts
    pub fn new(message: impl Into<String>, error_type: &str, code: &str) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.to_string(),
                code: code.to_string(),
                param: None,
            },
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
            GatewayError::KeyDisabled
            | GatewayError::ToolNotAllowed(_)
            | GatewayError::KeyAutoBanned(_) => StatusCode::FORBIDDEN,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = ErrorResponse::new(self.to_string(), self.error_type(), self.code());
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            GatewayError::auth("missing key").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(GatewayError::KeyDisabled.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            GatewayError::RateLimited("RPM limit exceeded".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            GatewayError::AllSourcesFailed("source a failed".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn body_carries_type_and_code() {
        let err = GatewayError::KeyAutoBanned("banned for 30m".into());
        let body = ErrorResponse::new(err.to_string(), err.error_type(), err.code());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["type"], "permission_error");
        assert_eq!(json["error"]["code"], "key_auto_banned");
        assert!(json["error"].get("param").is_none());
    }
}

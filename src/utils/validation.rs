//! Inbound request validation
//!
//! Rejects requests the upstream would reject anyway, before a source is
//! consumed on them.

use crate::core::models::openai::{ChatCompletionRequest, ChatMessage, MessageRole};
use crate::utils::error::{GatewayError, Result};

const MAX_MODEL_NAME_LEN: usize = 256;
const MAX_MESSAGES: usize = 4096;

/// Request validation utilities
pub struct RequestValidator;

impl RequestValidator {
    /// Validate a chat completion request body
    pub fn validate_chat_completion(req: &ChatCompletionRequest) -> Result<()> {
        Self::validate_model_name(&req.model)?;

        if req.messages.is_empty() {
            return Err(GatewayError::Validation(
                "messages cannot be empty".to_string(),
            ));
        }
        if req.messages.len() > MAX_MESSAGES {
            return Err(GatewayError::Validation(format!(
                "too many messages (limit {})",
                MAX_MESSAGES
            )));
        }
        for (i, message) in req.messages.iter().enumerate() {
            Self::validate_message(message, i)?;
        }

        if let Some(temperature) = req.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(GatewayError::Validation(
                    "temperature must be between 0.0 and 2.0".to_string(),
                ));
            }
        }
        if let Some(top_p) = req.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(GatewayError::Validation(
                    "top_p must be between 0.0 and 1.0".to_string(),
                ));
            }
        }
        if req.max_tokens == Some(0) || req.max_completion_tokens == Some(0) {
            return Err(GatewayError::Validation(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if let Some(n) = req.n {
            if n == 0 {
                return Err(GatewayError::Validation(
                    "n must be greater than 0".to_string(),
                ));
            }
        }

        if let Some(tools) = &req.tools {
            for tool in tools {
                if tool.function.name.is_empty() {
                    return Err(GatewayError::Validation(
                        "tool function name cannot be empty".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn validate_model_name(model: &str) -> Result<()> {
        if model.trim().is_empty() {
            return Err(GatewayError::Validation(
                "model cannot be empty".to_string(),
            ));
        }
        if model.len() > MAX_MODEL_NAME_LEN {
            return Err(GatewayError::Validation(
                "model name is too long".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_message(message: &ChatMessage, index: usize) -> Result<()> {
        match message.role {
            MessageRole::System | MessageRole::User => {
                if message.content.is_none() {
                    return Err(GatewayError::Validation(format!(
                        "message {} with role {} must have content",
                        index, message.role
                    )));
                }
            }
            // an assistant turn may carry only tool calls
            MessageRole::Assistant => {
                if message.content.is_none()
                    && message.tool_calls.as_ref().map_or(true, Vec::is_empty)
                    && message.function_call.is_none()
                {
                    return Err(GatewayError::Validation(format!(
                        "assistant message {} must have content or tool calls",
                        index
                    )));
                }
            }
            MessageRole::Tool => {
                if message.tool_call_id.is_none() {
                    return Err(GatewayError::Validation(format!(
                        "tool message {} must have tool_call_id",
                        index
                    )));
                }
            }
            MessageRole::Function => {
                if message.name.is_none() {
                    return Err(GatewayError::Validation(format!(
                        "function message {} must have a name",
                        index
                    )));
                }
            }
        }
        Ok(())
    }
}

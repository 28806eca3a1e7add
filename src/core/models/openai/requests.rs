//! Request structures for the OpenAI-compatible API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::messages::{ChatMessage, ContentPart, MessageContent};
use super::tools::{Function, FunctionCall, Tool, ToolChoice};

/// Chat completion request (OpenAI compatible)
///
/// Unknown sampling parameters are preserved so the proxied body reaches
/// the upstream intact. `None` fields are omitted from serialization, the
/// request is re-serialized when forwarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model to use for completion
    pub model: String,
    /// List of messages
    pub messages: Vec<ChatMessage>,
    /// Temperature (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Maximum completion tokens (newer parameter)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    /// Top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Number of completions to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Stream options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Presence penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Frequency penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Logit bias
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<HashMap<String, f32>>,
    /// User identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Function definitions (legacy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Function>>,
    /// Function call directive (legacy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Tools for function calling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    /// Tool choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Extended thinking configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,
    /// Response format hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// Seed for deterministic outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
}

impl ChatCompletionRequest {
    /// Whether the caller asked for tool calling, in either form
    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
            || self.functions.as_ref().is_some_and(|f| !f.is_empty())
    }

    /// Whether extended thinking is requested and enabled
    pub fn has_thinking(&self) -> bool {
        self.thinking.as_ref().is_some_and(ThinkingConfig::is_enabled)
    }

    /// Whether any message carries an image content part
    pub fn has_vision(&self) -> bool {
        self.messages.iter().any(|m| {
            matches!(&m.content, Some(MessageContent::Parts(parts))
                if parts.iter().any(|p| matches!(p, ContentPart::ImageUrl { .. })))
        })
    }

    /// Whether the caller asked for SSE streaming
    pub fn is_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    /// Tool definitions normalized to the modern form.
    ///
    /// Legacy `functions` entries are wrapped as function tools.
    pub fn effective_tools(&self) -> Vec<Tool> {
        if let Some(tools) = &self.tools {
            if !tools.is_empty() {
                return tools.clone();
            }
        }
        self.functions
            .as_ref()
            .map(|fns| fns.iter().cloned().map(Tool::function).collect())
            .unwrap_or_default()
    }
}

/// Extended thinking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingConfig {
    /// "enabled" or "disabled"
    #[serde(rename = "type")]
    pub kind: String,
    /// Token budget for the thinking phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_tokens: Option<u32>,
}

impl ThinkingConfig {
    /// Whether thinking is switched on
    pub fn is_enabled(&self) -> bool {
        self.kind == "enabled"
    }
}

/// Stream options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Ask the upstream for a final usage-bearing chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_usage: Option<bool>,
}

/// Response format hint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// "text", "json_object" or "json_schema"
    #[serde(rename = "type")]
    pub format_type: String,
    /// Schema body for "json_schema"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<serde_json::Value>,
}

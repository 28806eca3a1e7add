//! SSE event framing and streaming chunk shapes

use crate::core::models::openai::{MessageRole, Usage};
use actix_web::web;
use serde::{Deserialize, Serialize};

/// One server-sent event on the client stream
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// Optional event type
    pub event: Option<String>,
    /// Event payload
    pub data: String,
}

impl Event {
    /// Data-only event
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// The closing `[DONE]` sentinel
    pub fn done() -> Self {
        Self::data("[DONE]")
    }

    /// Wire framing: `data: <payload>\n\n`, with an optional event line
    pub fn to_bytes(&self) -> web::Bytes {
        let mut frame = String::with_capacity(self.data.len() + 16);
        if let Some(event) = &self.event {
            frame.push_str("event: ");
            frame.push_str(event);
            frame.push('\n');
        }
        frame.push_str("data: ");
        frame.push_str(&self.data);
        frame.push_str("\n\n");
        web::Bytes::from(frame)
    }
}

/// Streaming chunk for chat completions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Completion identifier
    pub id: String,
    /// Object type (always "chat.completion.chunk")
    pub object: String,
    /// Unix timestamp of creation
    pub created: u64,
    /// Model used
    pub model: String,
    /// Chunk choices
    pub choices: Vec<ChatCompletionChunkChoice>,
    /// Usage, only on the final chunk when the upstream reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionChunk {
    /// Empty chunk envelope for the given completion
    pub fn envelope(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "chat.completion.chunk".to_string(),
            created: chrono::Utc::now().timestamp() as u64,
            model: model.into(),
            choices: Vec::new(),
            usage: None,
        }
    }
}

/// Choice inside a streaming chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunkChoice {
    /// Choice index
    pub index: u32,
    /// Incremental delta
    pub delta: ChatCompletionDelta,
    /// Set on the closing chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Incremental content delta
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionDelta {
    /// Role, only on the first chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    /// Incremental text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool call deltas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Tool call delta for streaming function calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Tool call index
    pub index: u32,
    /// Tool call ID, first chunk only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool type, first chunk only
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    /// Function call delta
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCallDelta>,
}

/// Function call delta for streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    /// Function name, first chunk only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Incremental arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

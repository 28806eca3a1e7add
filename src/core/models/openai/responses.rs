//! Response structures for the OpenAI-compatible API

use serde::{Deserialize, Serialize};

use super::messages::ChatMessage;

/// Chat completion response (OpenAI compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Unique identifier for the completion
    pub id: String,
    /// Object type (always "chat.completion")
    pub object: String,
    /// Unix timestamp of creation
    pub created: u64,
    /// Model used for completion
    pub model: String,
    /// Array of completion choices
    pub choices: Vec<ChatChoice>,
    /// Usage statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// System fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

impl ChatCompletionResponse {
    /// Text content of the first choice, empty when absent
    pub fn first_content(&self) -> String {
        self.choices
            .first()
            .map(|c| c.message.content_text())
            .unwrap_or_default()
    }
}

/// Completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Index of the choice
    pub index: u32,
    /// The completion message
    pub message: ChatMessage,
    /// Reason the model stopped: "stop", "length", "tool_calls", ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// Model object for the models listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier
    pub id: String,
    /// Object type (always "model")
    pub object: String,
    /// Unix timestamp of creation
    pub created: u64,
    /// Owning organization
    pub owned_by: String,
}

impl Model {
    /// Model entry owned by the given organization
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created: chrono::Utc::now().timestamp() as u64,
            owned_by: owned_by.into(),
        }
    }
}

/// Models listing response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListResponse {
    /// Object type (always "list")
    pub object: String,
    /// Model entries
    pub data: Vec<Model>,
}

impl ModelListResponse {
    /// Wrap model entries in the list envelope
    pub fn new(data: Vec<Model>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::openai::messages::MessageRole;

    #[test]
    fn response_round_trips() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        }"#;
        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.first_content(), "hello");
        assert_eq!(resp.choices[0].message.role, MessageRole::Assistant);
        assert_eq!(resp.usage.unwrap().total_tokens, 7);
    }

    #[test]
    fn model_list_envelope() {
        let list = ModelListResponse::new(vec![Model::new("gpt-4", "openai")]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["object"], "list");
        assert_eq!(json["data"][0]["object"], "model");
    }
}

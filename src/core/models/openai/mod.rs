//! OpenAI-compatible API models
//!
//! This module defines the data structures that are compatible with OpenAI's
//! chat-completion API, organized into sub-modules:
//!
//! - `messages` - Message types, roles, and content
//! - `requests` - Chat completion request plus derived capability predicates
//! - `tools` - Tool and function calling definitions
//! - `responses` - Response structures and the models listing

pub mod messages;
pub mod requests;
pub mod responses;
pub mod tools;

pub use messages::{ChatMessage, ContentPart, ImageUrl, MessageContent, MessageRole};
pub use requests::{ChatCompletionRequest, ResponseFormat, StreamOptions, ThinkingConfig};
pub use responses::{ChatChoice, ChatCompletionResponse, Model, ModelListResponse, Usage};
pub use tools::{
    Function, FunctionCall, Tool, ToolCall, ToolChoice, ToolChoiceFunction, ToolChoiceFunctionSpec,
};

//! SSE streaming support
//!
//! - `types` - SSE event framing and the chat.completion.chunk shapes
//! - `forwarder` - the upstream→client byte pump with cancellation checks

pub mod forwarder;
pub mod types;

pub use forwarder::{pump_sse, StreamOutcome};
pub use types::{
    ChatCompletionChunk, ChatCompletionChunkChoice, ChatCompletionDelta, Event, FunctionCallDelta,
    ToolCallDelta,
};

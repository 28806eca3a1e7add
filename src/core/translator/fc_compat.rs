//! Function-calling compatibility layer
//!
//! Bridges tool-calling semantics over upstreams that cannot call tools
//! natively. The outbound conversation is rewritten into a prompt-based
//! protocol with exactly two legal reply shapes:
//!
//! ```text
//! {"tool_call":{"name":"<tool>","arguments":{...}}}
//! {"final":"<answer>"}
//! ```
//!
//! The reply is then projected back into the standard tool-calling
//! response shape. Unparseable output degrades to plain assistant
//! content rather than failing the request.

use crate::core::models::openai::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, MessageRole, Tool,
    ToolCall,
};
use crate::core::streaming::types::{
    ChatCompletionChunk, ChatCompletionChunkChoice, ChatCompletionDelta, Event, FunctionCallDelta,
    ToolCallDelta,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Rewrite a tools-bearing request into the prompt protocol.
///
/// Prepends the synthesized system message, normalizes tool-protocol
/// messages into plain dialogue, strips every tool field, and forces a
/// non-streaming upstream call (the client stream is synthesized
/// locally).
pub fn rewrite_request(req: &ChatCompletionRequest) -> ChatCompletionRequest {
    let tools = req.effective_tools();
    let mut out = req.clone();

    let mut messages = Vec::with_capacity(req.messages.len() + 1);
    messages.push(ChatMessage::text(MessageRole::System, tool_prompt(&tools)));
    messages.extend(req.messages.iter().map(normalize_message));
    out.messages = messages;

    out.tools = None;
    out.functions = None;
    out.tool_choice = None;
    out.function_call = None;
    out.stream = Some(false);
    out.stream_options = None;
    out
}

/// Synthesized system message enumerating the caller's tool schemas
fn tool_prompt(tools: &[Tool]) -> String {
    let mut prompt = String::from(
        "You have access to the following tools. You cannot call them \
         directly; instead you must reply with a single JSON object.\n\nTools:\n",
    );
    for (i, tool) in tools.iter().enumerate() {
        prompt.push_str(&format!("{}. {}", i + 1, tool.function.name));
        if let Some(description) = &tool.function.description {
            prompt.push_str(&format!(" - {}", description));
        }
        prompt.push('\n');
        if let Some(parameters) = &tool.function.parameters {
            prompt.push_str(&format!(
                "   Parameters (JSON Schema): {}\n",
                serde_json::to_string(parameters).unwrap_or_else(|_| "{}".to_string())
            ));
        }
    }
    prompt.push_str(
        "\nReply with exactly one JSON object and nothing else. \
         Do not wrap it in a code fence.\n\
         To call a tool:\n\
         {\"tool_call\":{\"name\":\"<tool name>\",\"arguments\":{<arguments object>}}}\n\
         To answer the user directly:\n\
         {\"final\":\"<your answer>\"}",
    );
    prompt
}

/// Flatten tool-protocol messages into dialogue an upstream without tool
/// support can follow
fn normalize_message(msg: &ChatMessage) -> ChatMessage {
    match msg.role {
        MessageRole::Tool => {
            let id = msg.tool_call_id.as_deref().unwrap_or("unknown");
            ChatMessage::text(
                MessageRole::User,
                format!("Tool result ({}): {}", id, msg.content_text()),
            )
        }
        MessageRole::Assistant
            if msg.tool_calls.as_ref().is_some_and(|t| !t.is_empty())
                || msg.function_call.is_some() =>
        {
            let mut text = msg.content_text();
            if let Some(calls) = &msg.tool_calls {
                for call in calls {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&format!(
                        "[called tool {} with arguments {}]",
                        call.function.name, call.function.arguments
                    ));
                }
            } else if let Some(call) = &msg.function_call {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&format!(
                    "[called function {} with arguments {}]",
                    call.name, call.arguments
                ));
            }
            ChatMessage::text(MessageRole::Assistant, text)
        }
        _ => msg.clone(),
    }
}

#[derive(Debug, Deserialize)]
struct CompatReply {
    #[serde(default)]
    tool_call: Option<RawToolCall>,
    #[serde(default, rename = "final")]
    final_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Project the upstream reply back into the tool-calling response shape.
///
/// A valid `tool_call` becomes `choices[0].message.tool_calls` with
/// `finish_reason="tool_calls"`; a `final` string becomes plain content
/// with `finish_reason="stop"`; anything unparseable passes through as
/// content, best effort.
pub fn project_response(upstream: ChatCompletionResponse) -> ChatCompletionResponse {
    let raw = upstream.first_content();
    let trimmed = strip_code_fence(&raw);

    let reply: Option<CompatReply> = serde_json::from_str(trimmed).ok();
    let (message, finish_reason) = match reply {
        Some(CompatReply {
            tool_call: Some(call),
            ..
        }) if !call.name.is_empty() => {
            let arguments = canonicalize_arguments(call.arguments);
            let message = ChatMessage {
                role: MessageRole::Assistant,
                tool_calls: Some(vec![ToolCall::function(call.name, arguments)]),
                ..Default::default()
            };
            (message, "tool_calls")
        }
        Some(CompatReply {
            final_text: Some(text),
            ..
        }) => (ChatMessage::text(MessageRole::Assistant, text), "stop"),
        _ => {
            debug!("compat reply did not parse, passing raw text through");
            (ChatMessage::text(MessageRole::Assistant, raw.clone()), "stop")
        }
    };

    ChatCompletionResponse {
        choices: vec![ChatChoice {
            index: 0,
            message,
            finish_reason: Some(finish_reason.to_string()),
        }],
        ..upstream
    }
}

/// Drop an optional surrounding ``` fence, with or without a `json` tag
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Canonicalize tool-call arguments into a JSON object string.
///
/// Missing or null arguments become `{}`; a string that itself parses as
/// JSON is used verbatim; any other string is wrapped as
/// `{"input":<original>}`.
fn canonicalize_arguments(arguments: Option<Value>) -> String {
    match arguments {
        None | Some(Value::Null) => "{}".to_string(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(&s) {
            Ok(Value::Object(obj)) => Value::Object(obj).to_string(),
            _ => serde_json::json!({ "input": s }).to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Synthesize the two-chunk client stream for a compat response.
///
/// The first chunk carries the role and either the tool calls or the
/// content; the second carries only the finish reason; `[DONE]` closes
/// the stream. No attempt is made to tokenize the text further.
pub fn synthesize_stream_events(response: &ChatCompletionResponse) -> Vec<Event> {
    let choice = response.choices.first();
    let finish_reason = choice
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_else(|| "stop".to_string());

    let mut first_delta = ChatCompletionDelta {
        role: Some(MessageRole::Assistant),
        ..Default::default()
    };
    match choice {
        Some(c) if c.message.tool_calls.is_some() => {
            first_delta.tool_calls = c.message.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .enumerate()
                    .map(|(i, call)| ToolCallDelta {
                        index: i as u32,
                        id: Some(call.id.clone()),
                        tool_type: Some(call.tool_type.clone()),
                        function: Some(FunctionCallDelta {
                            name: Some(call.function.name.clone()),
                            arguments: Some(call.function.arguments.clone()),
                        }),
                    })
                    .collect()
            });
        }
        Some(c) => {
            first_delta.content = Some(c.message.content_text());
        }
        None => {
            first_delta.content = Some(String::new());
        }
    }

    let first = ChatCompletionChunk {
        choices: vec![ChatCompletionChunkChoice {
            index: 0,
            delta: first_delta,
            finish_reason: None,
        }],
        ..ChatCompletionChunk::envelope(response.id.clone(), response.model.clone())
    };
    let closing = ChatCompletionChunk {
        choices: vec![ChatCompletionChunkChoice {
            index: 0,
            delta: ChatCompletionDelta::default(),
            finish_reason: Some(finish_reason),
        }],
        usage: response.usage,
        ..ChatCompletionChunk::envelope(response.id.clone(), response.model.clone())
    };

    vec![
        Event::data(serde_json::to_string(&first).unwrap_or_default()),
        Event::data(serde_json::to_string(&closing).unwrap_or_default()),
        Event::done(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::openai::tools::Function;
    use crate::core::models::openai::{MessageContent, Usage};

    fn upstream_response(content: &str) -> ChatCompletionResponse {
        ChatCompletionResponse {
            id: "chatcmpl-up".to_string(),
            object: "chat.completion".to_string(),
            created: 1_700_000_000,
            model: "base-model".to_string(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::text(MessageRole::Assistant, content),
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(Usage {
                prompt_tokens: 12,
                completion_tokens: 9,
                total_tokens: 21,
            }),
            system_fingerprint: None,
        }
    }

    fn tools_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "base-model".to_string(),
            messages: vec![ChatMessage::text(MessageRole::User, "weather in NYC?")],
            tools: Some(vec![Tool::function(Function {
                name: "get_weather".to_string(),
                description: Some("Look up current weather".to_string()),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {"city": {"type": "string"}}
                })),
            })]),
            stream: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn rewrite_strips_tool_fields_and_forces_non_stream() {
        let req = tools_request();
        let out = rewrite_request(&req);
        assert!(out.tools.is_none());
        assert!(out.functions.is_none());
        assert!(out.tool_choice.is_none());
        assert!(out.function_call.is_none());
        assert_eq!(out.stream, Some(false));

        let system = &out.messages[0];
        assert_eq!(system.role, MessageRole::System);
        let prompt = system.content_text();
        assert!(prompt.contains("get_weather"));
        assert!(prompt.contains("Look up current weather"));
        assert!(prompt.contains("{\"tool_call\""));
        assert!(prompt.contains("{\"final\""));
    }

    #[test]
    fn tool_messages_become_user_dialogue() {
        let mut req = tools_request();
        req.messages.push(ChatMessage {
            role: MessageRole::Assistant,
            tool_calls: Some(vec![ToolCall::function("get_weather", "{\"city\":\"NYC\"}")]),
            ..Default::default()
        });
        req.messages.push(ChatMessage {
            role: MessageRole::Tool,
            content: Some(MessageContent::Text("72F, sunny".to_string())),
            tool_call_id: Some("call_abc".to_string()),
            ..Default::default()
        });

        let out = rewrite_request(&req);
        // system + user + flattened assistant + tool-result-as-user
        assert_eq!(out.messages.len(), 4);

        let assistant = &out.messages[2];
        assert_eq!(assistant.role, MessageRole::Assistant);
        assert!(assistant.tool_calls.is_none());
        assert!(assistant.content_text().contains("called tool get_weather"));

        let tool_result = &out.messages[3];
        assert_eq!(tool_result.role, MessageRole::User);
        assert_eq!(
            tool_result.content_text(),
            "Tool result (call_abc): 72F, sunny"
        );
    }

    #[test]
    fn fenced_tool_call_projects_to_tool_calls() {
        let text = "```json\n{\"tool_call\":{\"name\":\"get_weather\",\"arguments\":{\"city\":\"NYC\"}}}\n```";
        let projected = project_response(upstream_response(text));

        let choice = &projected.choices[0];
        assert_eq!(choice.finish_reason.as_deref(), Some("tool_calls"));
        let calls = choice.message.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_type, "function");
        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments, "{\"city\":\"NYC\"}");
        // envelope fields survive projection
        assert_eq!(projected.id, "chatcmpl-up");
        assert_eq!(projected.usage.unwrap().total_tokens, 21);
    }

    #[test]
    fn final_reply_projects_to_plain_content() {
        let projected =
            project_response(upstream_response("{\"final\":\"It is sunny in NYC.\"}"));
        let choice = &projected.choices[0];
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
        assert!(choice.message.tool_calls.is_none());
        assert_eq!(choice.message.content_text(), "It is sunny in NYC.");
    }

    #[test]
    fn unparseable_reply_passes_through_as_content() {
        let projected = project_response(upstream_response("I cannot answer in JSON, sorry."));
        let choice = &projected.choices[0];
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
        assert_eq!(
            choice.message.content_text(),
            "I cannot answer in JSON, sorry."
        );
    }

    #[test]
    fn empty_tool_name_falls_back_to_raw_text() {
        let text = "{\"tool_call\":{\"name\":\"\",\"arguments\":{}}}";
        let projected = project_response(upstream_response(text));
        assert_eq!(projected.choices[0].finish_reason.as_deref(), Some("stop"));
        assert!(projected.choices[0].message.tool_calls.is_none());
    }

    #[test]
    fn argument_canonicalization_rules() {
        assert_eq!(canonicalize_arguments(None), "{}");
        assert_eq!(canonicalize_arguments(Some(Value::Null)), "{}");
        assert_eq!(
            canonicalize_arguments(Some(serde_json::json!({"city": "NYC"}))),
            "{\"city\":\"NYC\"}"
        );
        // a string holding JSON is unwrapped
        assert_eq!(
            canonicalize_arguments(Some(Value::String("{\"city\":\"NYC\"}".to_string()))),
            "{\"city\":\"NYC\"}"
        );
        // a plain string is wrapped
        assert_eq!(
            canonicalize_arguments(Some(Value::String("NYC".to_string()))),
            "{\"input\":\"NYC\"}"
        );
    }

    #[test]
    fn stream_synthesis_emits_two_chunks_and_done() {
        let text = "{\"tool_call\":{\"name\":\"get_weather\",\"arguments\":{\"city\":\"NYC\"}}}";
        let projected = project_response(upstream_response(text));
        let events = synthesize_stream_events(&projected);
        assert_eq!(events.len(), 3);

        let first: ChatCompletionChunk = serde_json::from_str(&events[0].data).unwrap();
        let delta = &first.choices[0].delta;
        assert_eq!(delta.role, Some(MessageRole::Assistant));
        let calls = delta.tool_calls.as_ref().unwrap();
        assert_eq!(
            calls[0].function.as_ref().unwrap().name.as_deref(),
            Some("get_weather")
        );
        assert!(first.choices[0].finish_reason.is_none());

        let closing: ChatCompletionChunk = serde_json::from_str(&events[1].data).unwrap();
        assert_eq!(
            closing.choices[0].finish_reason.as_deref(),
            Some("tool_calls")
        );

        assert_eq!(events[2].data, "[DONE]");
    }

    #[test]
    fn content_reply_streams_as_content_delta() {
        let projected = project_response(upstream_response("{\"final\":\"hello\"}"));
        let events = synthesize_stream_events(&projected);
        let first: ChatCompletionChunk = serde_json::from_str(&events[0].data).unwrap();
        assert_eq!(first.choices[0].delta.content.as_deref(), Some("hello"));
    }
}

//! Source-aware request translation

use super::fc_compat;
use crate::core::models::openai::ChatCompletionRequest;
use crate::core::sources::{Source, SourceType};
use tracing::debug;

/// An adapted request ready for one upstream attempt
#[derive(Debug, Clone)]
pub struct TranslatedRequest {
    /// The body to send upstream
    pub request: ChatCompletionRequest,
    /// The compatibility layer rewrote this request and must project the
    /// reply back into tool-calling shape
    pub fc_compat: bool,
}

/// Adapt the request for the given source.
///
/// Aggregators never see `thinking` and get the compatibility rewrite
/// whenever the (model, provider) pair lacks native FC. Other source
/// types follow their declared capabilities: undeclared thinking is
/// stripped, undeclared FC goes through the compatibility rewrite.
pub fn translate(req: &ChatCompletionRequest, source: &Source) -> TranslatedRequest {
    let mut out = req.clone();
    let mut fc = false;

    match source.source_type {
        SourceType::Cpa => {
            out.thinking = None;
            if req.has_tools() && !source.supports_fc(&req.model) {
                out = fc_compat::rewrite_request(&out);
                fc = true;
            }
        }
        // anthropic upstreams speak the OpenAI-compatible surface here;
        // native-protocol translation would hook in on this arm
        SourceType::Anthropic | SourceType::OpenAi | SourceType::NewApi | SourceType::Custom => {
            if req.has_thinking() && !source.supports_thinking() {
                out.thinking = None;
            }
            if req.has_tools() && !source.supports_fc(&req.model) {
                out = fc_compat::rewrite_request(&out);
                fc = true;
            }
        }
    }

    if fc {
        debug!(
            source = %source.id,
            model = %req.model,
            "using function-calling compatibility rewrite"
        );
    }

    TranslatedRequest {
        request: out,
        fc_compat: fc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::openai::tools::{Function, Tool};
    use crate::core::models::openai::{ChatMessage, MessageRole, ThinkingConfig};
    use crate::core::sources::{
        AggregatorConfig, Capabilities, Source, SourceRecord, SourceType,
    };

    fn source(source_type: SourceType, fc: bool, thinking: bool) -> Source {
        Source::from_record(SourceRecord {
            id: "s".to_string(),
            name: "S".to_string(),
            source_type,
            base_url: "https://s.example.com".to_string(),
            api_key: None,
            priority: 1,
            weight: 1,
            enabled: true,
            capabilities: Capabilities {
                function_calling: fc,
                thinking,
                vision: false,
                models: vec![],
            },
            aggregator: if source_type == SourceType::Cpa {
                Some(AggregatorConfig {
                    providers: vec!["gemini".to_string()],
                    auto_detect: true,
                    ..Default::default()
                })
            } else {
                None
            },
        })
    }

    fn request_with_tools_and_thinking() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![ChatMessage::text(MessageRole::User, "hi")],
            tools: Some(vec![Tool::function(Function {
                name: "get_weather".to_string(),
                description: None,
                parameters: None,
            })]),
            thinking: Some(ThinkingConfig {
                kind: "enabled".to_string(),
                budget_tokens: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn fc_capable_source_passes_tools_through() {
        let req = request_with_tools_and_thinking();
        let out = translate(&req, &source(SourceType::OpenAi, true, true));
        assert!(!out.fc_compat);
        assert!(out.request.tools.is_some());
        assert!(out.request.thinking.is_some());
    }

    #[test]
    fn thinking_is_stripped_when_undeclared() {
        let req = request_with_tools_and_thinking();
        let out = translate(&req, &source(SourceType::OpenAi, true, false));
        assert!(out.request.thinking.is_none());
        assert!(!out.fc_compat);
    }

    #[test]
    fn non_fc_source_triggers_compat_rewrite() {
        let req = request_with_tools_and_thinking();
        let out = translate(&req, &source(SourceType::Custom, false, true));
        assert!(out.fc_compat);
        assert!(out.request.tools.is_none());
        assert!(out.request.functions.is_none());
        assert_eq!(out.request.stream, Some(false));
    }

    #[test]
    fn aggregator_always_strips_thinking() {
        let mut req = request_with_tools_and_thinking();
        req.tools = None;
        let agg = source(SourceType::Cpa, false, false);
        let out = translate(&req, &agg);
        assert!(out.request.thinking.is_none());
        assert!(!out.fc_compat);
    }

    #[test]
    fn aggregator_without_provider_fc_uses_compat() {
        let req = request_with_tools_and_thinking();
        // no detected provider mapping for the model, so no native FC
        let agg = source(SourceType::Cpa, false, false);
        let out = translate(&req, &agg);
        assert!(out.fc_compat);
        assert!(out.request.thinking.is_none());
    }

    #[test]
    fn original_request_is_never_mutated() {
        let req = request_with_tools_and_thinking();
        let _ = translate(&req, &source(SourceType::Custom, false, false));
        assert!(req.tools.is_some());
        assert!(req.thinking.is_some());
    }
}

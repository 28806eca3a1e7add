//! Tool and function calling types for the OpenAI-compatible API
//!
//! Both the modern `tools` form and the legacy `functions` form are
//! accepted on inbound requests.

use serde::{Deserialize, Serialize};

/// Function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function parameters schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Function call (legacy and inside tool calls)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments (JSON string)
    pub arguments: String,
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool type, always "function" today
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function definition
    pub function: Function,
}

impl Tool {
    /// Wrap a function definition as a tool
    pub fn function(function: Function) -> Self {
        Self {
            tool_type: "function".to_string(),
            function,
        }
    }
}

/// Tool choice
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// "none" / "auto" / "required"
    Mode(String),
    /// Specific tool to use
    Specific(ToolChoiceFunction),
}

/// Specific tool choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    /// Tool type
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function specification
    pub function: ToolChoiceFunctionSpec,
}

/// Tool choice function specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolChoiceFunctionSpec {
    /// Function name
    pub name: String,
}

/// Tool call emitted by the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool type
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function call
    pub function: FunctionCall,
}

impl ToolCall {
    /// Build a function tool call with a fresh id
    pub fn function(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_choice_accepts_mode_and_specific() {
        let auto: ToolChoice = serde_json::from_str("\"auto\"").unwrap();
        assert!(matches!(auto, ToolChoice::Mode(s) if s == "auto"));

        let specific: ToolChoice = serde_json::from_str(
            r#"{"type":"function","function":{"name":"get_weather"}}"#,
        )
        .unwrap();
        match specific {
            ToolChoice::Specific(f) => assert_eq!(f.function.name, "get_weather"),
            ToolChoice::Mode(_) => panic!("expected specific tool choice"),
        }
    }

    #[test]
    fn generated_tool_call_ids_are_unique() {
        let a = ToolCall::function("f", "{}");
        let b = ToolCall::function("f", "{}");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("call_"));
    }
}

//! Client tool detection
//!
//! Maps inbound request headers to a canonical client-tool identifier.
//! An explicit `X-Client-Name` header wins; otherwise the lowercased
//! User-Agent is matched against a fixed, ordered pattern list. Pure
//! function, no state.

/// Canonical value for an unrecognized client
pub const UNKNOWN_TOOL: &str = "unknown";

/// Ordered (pattern, tool) pairs matched against the lowercased
/// User-Agent. Order matters: more specific agents come first.
const UA_PATTERNS: &[(&str, &str)] = &[
    ("cursor", "cursor"),
    ("claude-code", "claude-code"),
    ("claude-cli", "claude-code"),
    ("codex", "codex-cli"),
    ("continue", "continue"),
    ("copilot", "copilot"),
    ("github-copilot", "copilot"),
    ("openai-python", "openai-sdk"),
    ("openai-node", "openai-sdk"),
    ("openai/", "openai-sdk"),
    ("anthropic-sdk", "anthropic-sdk"),
    ("anthropic-python", "anthropic-sdk"),
];

/// The closed set of canonical tool identifiers
pub const KNOWN_TOOLS: &[&str] = &[
    "cursor",
    "claude-code",
    "codex-cli",
    "continue",
    "copilot",
    "openai-sdk",
    "anthropic-sdk",
    UNKNOWN_TOOL,
];

/// Detect the client tool from the explicit header and the User-Agent
pub fn detect_tool(client_name: Option<&str>, user_agent: Option<&str>) -> String {
    if let Some(name) = client_name {
        let name = name.trim().to_lowercase();
        if !name.is_empty() {
            return normalize(&name);
        }
    }

    if let Some(ua) = user_agent {
        let ua = ua.to_lowercase();
        for (pattern, tool) in UA_PATTERNS {
            if ua.contains(pattern) {
                return (*tool).to_string();
            }
        }
    }

    UNKNOWN_TOOL.to_string()
}

/// Collapse an explicit client name onto the closed set
fn normalize(name: &str) -> String {
    for tool in KNOWN_TOOLS {
        if name == *tool {
            return (*tool).to_string();
        }
    }
    for (pattern, tool) in UA_PATTERNS {
        if name.contains(pattern) {
            return (*tool).to_string();
        }
    }
    UNKNOWN_TOOL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_header_wins_over_user_agent() {
        let tool = detect_tool(Some("cursor"), Some("openai-python/1.40.0"));
        assert_eq!(tool, "cursor");
    }

    #[test]
    fn user_agent_patterns_match_in_order() {
        assert_eq!(detect_tool(None, Some("Cursor/0.42 (darwin)")), "cursor");
        assert_eq!(detect_tool(None, Some("claude-code/1.2.3")), "claude-code");
        assert_eq!(detect_tool(None, Some("Codex-CLI 2.0")), "codex-cli");
        assert_eq!(detect_tool(None, Some("Continue/0.9")), "continue");
        assert_eq!(detect_tool(None, Some("GitHub-Copilot/1.0")), "copilot");
        assert_eq!(detect_tool(None, Some("OpenAI-Python/1.40.0")), "openai-sdk");
        assert_eq!(detect_tool(None, Some("anthropic-sdk-typescript")), "anthropic-sdk");
    }

    #[test]
    fn unmatched_inputs_are_unknown() {
        assert_eq!(detect_tool(None, Some("curl/8.4.0")), UNKNOWN_TOOL);
        assert_eq!(detect_tool(None, None), UNKNOWN_TOOL);
        assert_eq!(detect_tool(Some("   "), Some("curl/8.4.0")), UNKNOWN_TOOL);
    }

    #[test]
    fn explicit_names_stay_on_the_closed_set() {
        assert_eq!(detect_tool(Some("Claude-Code"), None), "claude-code");
        assert_eq!(detect_tool(Some("MyAgent"), None), UNKNOWN_TOOL);
    }
}

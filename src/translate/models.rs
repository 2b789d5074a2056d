//! Model-id aliasing and the small predicate tables that drive thinking
//! and Claude-specific request shaping.
//!
//! There is no concrete alias table or thinking-model list in any
//! grounding source available to this crate, so the table below is a
//! judgment call rather than a derived fact (see DESIGN.md).

/// Inbound aliases accepted from any of the three surfaces, mapped to a
/// concrete upstream antigravity model id. Unknown ids pass through
/// unchanged so new upstream models work without a code change.
const ALIASES: &[(&str, &str)] = &[
    ("gpt-4o", "gemini-2.5-pro"),
    ("gpt-4o-mini", "gemini-2.5-flash"),
    ("gpt-4.1", "gemini-2.5-pro"),
    ("gpt-5", "claude-sonnet-4-5-thinking"),
    ("claude-3-5-sonnet-latest", "claude-sonnet-4-5"),
    ("claude-3-7-sonnet-latest", "claude-sonnet-4-5-thinking"),
    ("claude-sonnet-4-5-20250929", "claude-sonnet-4-5"),
    ("gemini-pro", "gemini-2.5-pro"),
    ("gemini-flash", "gemini-2.5-flash"),
];

/// Upstream antigravity models this gateway advertises via the model-list
/// endpoints, independent of the aliasing table above.
pub const KNOWN_MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "claude-sonnet-4-5",
    "claude-sonnet-4-5-thinking",
];

pub fn resolve_model(model: &str) -> String {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == model)
        .map(|(_, target)| target.to_string())
        .unwrap_or_else(|| model.to_string())
}

/// Whether the resolved model id should get `thinkingConfig` populated.
pub fn is_enable_thinking(model: &str) -> bool {
    model.contains("thinking") || model.contains("-pro")
}

/// Whether the resolved model id is a Claude-family model (drives the
/// `top_p`-omission rule in `NormalizedParams::project`).
pub fn is_claude_model(model: &str) -> bool {
    model.starts_with("claude")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_alias_resolves() {
        assert_eq!(resolve_model("gpt-4o"), "gemini-2.5-pro");
    }

    #[test]
    fn unknown_model_passes_through() {
        assert_eq!(resolve_model("some-future-model"), "some-future-model");
    }

    #[test]
    fn claude_thinking_detected() {
        assert!(is_claude_model("claude-sonnet-4-5-thinking"));
        assert!(is_enable_thinking("claude-sonnet-4-5-thinking"));
        assert!(!is_enable_thinking("claude-sonnet-4-5"));
    }

    #[test]
    fn gemini_pro_defaults_to_thinking_enabled() {
        assert!(is_enable_thinking("gemini-2.5-pro"));
        assert!(!is_claude_model("gemini-2.5-pro"));
    }
}

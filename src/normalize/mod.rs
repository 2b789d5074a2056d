//! Collapses the three inbound generation-parameter shapes into one internal
//! shape, then projects it back to the upstream `generationConfig`.

use gateway_schema::claude::{ClaudeMessagesRequest, ClaudeThinkingConfig};
use gateway_schema::gemini::{GeminiGenerateContentRequest, GenerationConfig};
use gateway_schema::openai::OpenaiChatRequest;

/// `{max_tokens, temperature, top_p, top_k, thinking_budget?}` — one shape
/// for all three inbound dialects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedParams {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub thinking_budget: Option<u32>,
}

/// `{low:1024, medium:16000, high:32000}`.
fn reasoning_effort_to_budget(effort: &str) -> Option<u32> {
    match effort {
        "low" => Some(1024),
        "medium" => Some(16000),
        "high" => Some(32000),
        _ => None,
    }
}

impl NormalizedParams {
    pub fn from_openai(req: &OpenaiChatRequest) -> Self {
        let thinking_budget = req.thinking_budget.or_else(|| {
            req.reasoning_effort
                .as_deref()
                .and_then(reasoning_effort_to_budget)
        });

        Self {
            max_tokens: req.max_tokens.or(req.max_completion_tokens),
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
            thinking_budget,
        }
    }

    pub fn from_claude(req: &ClaudeMessagesRequest) -> Self {
        let thinking_budget = match &req.thinking {
            Some(ClaudeThinkingConfig::Enabled { budget_tokens }) => Some(*budget_tokens),
            Some(ClaudeThinkingConfig::Disabled) => Some(0),
            None => None,
        };

        Self {
            max_tokens: Some(req.max_tokens),
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
            thinking_budget,
        }
    }

    pub fn from_gemini(req: &GeminiGenerateContentRequest) -> Self {
        let Some(gc) = req.generation_config.as_ref() else {
            return Self::default();
        };

        let thinking_budget = gc.thinking_config.as_ref().and_then(|tc| {
            let include_thoughts = tc.get("includeThoughts").and_then(|v| v.as_bool());
            if include_thoughts == Some(false) {
                return Some(0);
            }
            tc.get("thinkingBudget")
                .and_then(|v| v.as_u64())
                .map(|v| v as u32)
        });

        Self {
            max_tokens: gc.max_output_tokens,
            temperature: gc.temperature,
            top_p: gc.top_p,
            top_k: gc.top_k,
            thinking_budget,
        }
    }

    /// Projects the normalized parameters back to the upstream
    /// `generationConfig`. `claude_thinking_model` gates the `topP` omission
    /// rule: if the effective model id contains "claude" and thinking is
    /// enabled, `topP` is omitted (upstream constraint).
    pub fn project(&self, claude_thinking_model: bool) -> GenerationConfig {
        let thinking_enabled = self.thinking_budget.is_some_and(|b| b > 0);
        let include_thoughts = self.thinking_budget.is_some_and(|b| b > 0);

        let top_p = if claude_thinking_model && thinking_enabled {
            None
        } else {
            self.top_p
        };

        let thinking_config = self.thinking_budget.map(|budget| {
            serde_json::json!({
                "includeThoughts": include_thoughts,
                "thinkingBudget": budget,
            })
        });

        GenerationConfig {
            temperature: self.temperature,
            top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_tokens,
            thinking_config,
            image_config: None,
            extra: [("candidateCount".to_string(), serde_json::json!(1))]
                .into_iter()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openai_reasoning_effort_maps_to_budget() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "gpt-x",
            "messages": [],
            "reasoning_effort": "medium"
        }))
        .unwrap();
        let normalized = NormalizedParams::from_openai(&req);
        assert_eq!(normalized.thinking_budget, Some(16000));
    }

    #[test]
    fn openai_explicit_thinking_budget_wins_over_effort() {
        let req: OpenaiChatRequest = serde_json::from_value(json!({
            "model": "gpt-x",
            "messages": [],
            "thinking_budget": 500,
            "reasoning_effort": "high"
        }))
        .unwrap();
        let normalized = NormalizedParams::from_openai(&req);
        assert_eq!(normalized.thinking_budget, Some(500));
    }

    #[test]
    fn claude_thinking_disabled_maps_to_zero_budget() {
        let req: ClaudeMessagesRequest = serde_json::from_value(json!({
            "model": "claude-x",
            "max_tokens": 100,
            "messages": [],
            "thinking": {"type": "disabled"}
        }))
        .unwrap();
        let normalized = NormalizedParams::from_claude(&req);
        assert_eq!(normalized.thinking_budget, Some(0));
    }

    #[test]
    fn gemini_include_thoughts_false_forces_zero_budget() {
        let req: GeminiGenerateContentRequest = serde_json::from_value(json!({
            "contents": [],
            "generationConfig": {
                "thinkingConfig": {"includeThoughts": false, "thinkingBudget": 2048}
            }
        }))
        .unwrap();
        let normalized = NormalizedParams::from_gemini(&req);
        assert_eq!(normalized.thinking_budget, Some(0));
    }

    #[test]
    fn project_sets_include_thoughts_false_when_budget_zero() {
        let normalized = NormalizedParams {
            thinking_budget: Some(0),
            ..Default::default()
        };
        let gc = normalized.project(false);
        let tc = gc.thinking_config.unwrap();
        assert_eq!(tc["includeThoughts"], json!(false));
    }

    #[test]
    fn project_omits_top_p_for_claude_thinking_models() {
        let normalized = NormalizedParams {
            top_p: Some(0.9),
            thinking_budget: Some(4096),
            ..Default::default()
        };
        let gc = normalized.project(true);
        assert!(gc.top_p.is_none());
    }

    #[test]
    fn project_keeps_top_p_for_non_claude_models() {
        let normalized = NormalizedParams {
            top_p: Some(0.9),
            thinking_budget: Some(4096),
            ..Default::default()
        };
        let gc = normalized.project(false);
        assert_eq!(gc.top_p, Some(0.9));
    }
}

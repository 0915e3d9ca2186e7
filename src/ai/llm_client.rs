// LLM collaborator contract
//
// Anything that can answer `(system prompt, user prompt, freeform)` with JSON
// or plain text implements `LlmClient`. The Claude client is the production
// implementation; tests script responses.

use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the LLM endpoint, stored under the `ai_config` setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AiConfig {
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AiConfig {
    /// Replace out-of-range values with defaults.
    pub fn sanitized(self) -> Self {
        let defaults = AiConfig::default();
        let api_url = if self.api_url.trim().is_empty() {
            warn!("empty AI api url, using default");
            defaults.api_url
        } else {
            self.api_url
        };
        let model = if self.model.trim().is_empty() {
            defaults.model
        } else {
            self.model
        };
        AiConfig {
            api_url,
            model,
            max_tokens: if self.max_tokens == 0 { defaults.max_tokens } else { self.max_tokens },
            timeout_secs: if self.timeout_secs == 0 { defaults.timeout_secs } else { self.timeout_secs },
        }
    }
}

/// What the collaborator answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    Json(Value),
    Text(String),
}

impl LlmResponse {
    pub fn into_json(self) -> Result<Value, LlmError> {
        match self {
            LlmResponse::Json(value) => Ok(value),
            LlmResponse::Text(text) => Err(LlmError::parse("expected a JSON object", &text)),
        }
    }

    pub fn into_text(self) -> Result<String, LlmError> {
        match self {
            LlmResponse::Text(text) => Ok(text),
            LlmResponse::Json(value) => Ok(value.to_string()),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Ask the model. With `freeform == false` the answer is parsed as JSON
    /// (fenced or bare); otherwise the raw text comes back.
    async fn call_llm(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        freeform: bool,
    ) -> Result<LlmResponse, LlmError>;
}

/// Extract JSON from response text (handles markdown code blocks)
pub fn extract_json(text: &str) -> Option<&str> {
    // Fenced block with a language tag
    if let Some(start) = text.find("```json") {
        let json_start = start + "```json".len();
        if let Some(end) = text[json_start..].find("```") {
            return Some(text[json_start..json_start + end].trim());
        }
    }

    // Generic code block
    if let Some(start) = text.find("```") {
        let after_ticks = start + 3;
        let json_start = text[after_ticks..]
            .find('\n')
            .map(|i| after_ticks + i + 1)
            .unwrap_or(after_ticks);
        if let Some(end) = text[json_start..].find("```") {
            return Some(text[json_start..json_start + end].trim());
        }
    }

    // Raw JSON object
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].trim())
}

/// Parse a non-freeform answer, keeping a snippet of the text on failure.
pub fn parse_json_response(text: &str) -> Result<Value, LlmError> {
    let json = extract_json(text).ok_or_else(|| LlmError::parse("No JSON found in response", text))?;
    serde_json::from_str(json).map_err(|e| LlmError::parse(e.to_string(), json))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_from_markdown() {
        let text = "Here you go:\n\n```json\n{\"tag_ids\": [\"g_synthwave\"]}\n```\n\nEnjoy!";
        assert_eq!(extract_json(text), Some("{\"tag_ids\": [\"g_synthwave\"]}"));
    }

    #[test]
    fn test_extract_json_generic_fence() {
        let text = "```\n{\"titles\": [\"Night Drive\"]}\n```";
        assert_eq!(extract_json(text), Some("{\"titles\": [\"Night Drive\"]}"));
    }

    #[test]
    fn test_extract_json_raw() {
        let text = r#"{"themes": ["rain"]}"#;
        assert_eq!(extract_json(text), Some(text));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_parse_failure_carries_snippet() {
        let garbage = format!("{{ not json {} }}", "x".repeat(400));
        match parse_json_response(&garbage) {
            Err(LlmError::Parse { snippet, .. }) => {
                assert!(snippet.starts_with("{ not json"));
                assert!(snippet.chars().count() <= crate::error::SNIPPET_LEN + 1);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_json_response_ok() {
        let value = parse_json_response("Sure!\n```json\n{\"titles\":[\"A\"]}\n```").unwrap();
        assert_eq!(value, json!({"titles": ["A"]}));
    }

    #[test]
    fn test_response_conversions() {
        assert!(LlmResponse::Text("plain".into()).into_json().is_err());
        assert_eq!(LlmResponse::Text("plain".into()).into_text().unwrap(), "plain");
    }

    #[test]
    fn test_ai_config_defaults_and_sanitize() {
        let parsed: AiConfig = serde_json::from_str(r#"{"model":"","maxTokens":0}"#).unwrap();
        let config = parsed.sanitized();
        assert_eq!(config, AiConfig::default());

        let custom: AiConfig = serde_json::from_str(r#"{"timeoutSecs":90}"#).unwrap();
        assert_eq!(custom.timeout_secs, 90);
        assert_eq!(custom.api_url, DEFAULT_API_URL);
    }
}

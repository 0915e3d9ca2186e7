// Claude API client
//
// Implements the LLM collaborator against Anthropic's messages endpoint.
// Timeouts come from `AiConfig`; there is no retry policy here.

use crate::ai::llm_client::{parse_json_response, AiConfig, LlmClient, LlmResponse};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const CLAUDE_VERSION: &str = "2023-06-01";

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

/// Request to Claude API
#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

/// Response from Claude API
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

pub struct ClaudeClient {
    api_key: String,
    config: AiConfig,
    client: Client,
}

impl ClaudeClient {
    /// Create a new Claude client with the given API key
    pub fn new(api_key: String, config: AiConfig) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let config = config.sanitized();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            config,
            client,
        })
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Send a chat message and get the complete text response
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let request = ClaudeRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages,
            system: system_prompt,
        };

        debug!(model = %self.config.model, "sending LLM request");
        let response = self
            .client
            .post(&self.config.api_url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", CLAUDE_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Request(format!("Failed to read response: {}", e)))?;

        info!(
            stop_reason = claude_response.stop_reason.as_deref().unwrap_or("unknown"),
            "LLM response received"
        );

        // Extract text from content blocks
        Ok(claude_response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn call_llm(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        freeform: bool,
    ) -> Result<LlmResponse, LlmError> {
        let messages = vec![Message {
            role: "user".to_string(),
            content: user_prompt.to_string(),
        }];
        let text = self.chat(messages, Some(system_prompt)).await?;
        if freeform {
            Ok(LlmResponse::Text(text))
        } else {
            parse_json_response(&text).map(LlmResponse::Json)
        }
    }
}

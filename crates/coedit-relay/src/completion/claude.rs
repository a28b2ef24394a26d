//! Completion engine backed by the Anthropic Messages API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use coedit_common::{CompletionError, CompletionRequest};
use coedit_config::CompletionConfig;
use tracing::debug;

use super::CompletionEngine;

pub(crate) const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub(crate) const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are a code completion engine. Continue the user's code \
    from where it ends. Reply with the continuation only: no prose, no code fences.";

pub struct ClaudeEngine {
    api_key: String,
    model: String,
    max_tokens: u32,
    http: reqwest::Client,
}

impl fmt::Debug for ClaudeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeEngine")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ClaudeEngine {
    pub fn new(api_key: impl Into<String>, config: &CompletionConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CompletionError::NotConfigured(e.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            http,
        })
    }

    /// Read the API key from `ANTHROPIC_API_KEY`.
    pub fn from_env(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            CompletionError::NotConfigured("set ANTHROPIC_API_KEY to use the claude provider".into())
        })?;
        Self::new(key, config)
    }

    pub(crate) fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": request.prefix() }
            ],
        })
    }

    /// First text block of the response, trimmed of trailing whitespace.
    pub(crate) fn parse_response(json: &serde_json::Value) -> Option<String> {
        json["content"]
            .as_array()?
            .iter()
            .find_map(|b| {
                if b["type"] == "text" {
                    b["text"].as_str().map(|t| t.trim_end().to_string())
                } else {
                    None
                }
            })
            .filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl CompletionEngine for ClaudeEngine {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<Option<String>, CompletionError> {
        let body = self.build_request_body(request);

        debug!(model = %self.model, cursor = request.cursor_position, "Claude completion request");

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        Ok(Self::parse_response(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ClaudeEngine {
        ClaudeEngine::new("test-key", &CompletionConfig::default()).unwrap()
    }

    #[test]
    fn request_body_sends_prefix_only() {
        let request = CompletionRequest {
            context: "def f():\n    return 1".into(),
            cursor_position: 8,
        };
        let body = engine().build_request_body(&request);
        assert_eq!(body["messages"][0]["content"], "def f():");
        assert_eq!(body["max_tokens"], 256);
        assert!(body["system"].as_str().unwrap().contains("continuation"));
    }

    #[test]
    fn parse_response_picks_first_text_block() {
        let json = serde_json::json!({
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "    pass\n" }
            ]
        });
        assert_eq!(ClaudeEngine::parse_response(&json).as_deref(), Some("    pass"));
    }

    #[test]
    fn parse_response_without_text_is_none() {
        let json = serde_json::json!({ "content": [] });
        assert!(ClaudeEngine::parse_response(&json).is_none());

        let json = serde_json::json!({ "content": [{ "type": "text", "text": "  " }] });
        assert!(ClaudeEngine::parse_response(&json).is_none());
    }

    #[test]
    fn debug_redacts_key() {
        let dbg = format!("{:?}", engine());
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("test-key"));
    }
}

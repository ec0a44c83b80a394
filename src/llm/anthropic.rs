use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::client::{http_client, post_json, Message};
use super::{CompletionClient, LlmConfig};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    config: LlmConfig,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn build_request(&self, system: &str, user: &str) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            system: Some(system.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        }
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let endpoint = self.config.endpoint("messages");
        let request = self
            .client
            .post(&endpoint)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(system, user));

        post_json::<AnthropicResponse>(request, &endpoint).await?.into_text()
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

impl AnthropicResponse {
    /// Text of the first text content block
    fn into_text(self) -> Result<String> {
        self.content
            .into_iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text.trim().to_string())
            .context("No text content in response")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::llm::Provider;

    fn test_config() -> LlmConfig {
        LlmConfig {
            provider: Provider::Anthropic,
            api_key: "key".to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-test".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_request_puts_system_at_top_level() {
        let client = AnthropicClient::new(test_config()).unwrap();
        let body = serde_json::to_value(client.build_request("sys", "user")).unwrap();

        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 1024);
    }

    #[test]
    fn test_response_text_block() {
        let json = r#"{"content": [{"type": "thinking"}, {"type": "text", "text": " [\"好。\"] "}]}"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "[\"好。\"]");

        let response: AnthropicResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert!(response.into_text().is_err());
    }
}

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::AnthropicClient;

/// Chat-style completion service: one system instruction, one user message,
/// one text completion back
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Short backend name for log lines
    fn name(&self) -> &str;
}

/// Which completion API to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Any OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            other => anyhow::bail!("Unknown provider '{}' (expected openai or anthropic)", other),
        }
    }
}

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "deepseek/deepseek-chat:free";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration for the completion service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    /// API key for the selected provider
    pub api_key: String,
    /// Base endpoint, without the trailing resource path
    pub base_url: String,
    pub model: String,
    /// Low temperature keeps punctuation stable across retries
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl LlmConfig {
    /// Create config from environment variables
    ///
    /// `PUNCTUATOR_PROVIDER` selects the backend (default `openai`); the key
    /// comes from `OPENAI_API_KEY` or `ANTHROPIC_API_KEY`, the endpoint from
    /// `OPENAI_BASE_URL` / `ANTHROPIC_BASE_URL` and the model from
    /// `PUNCTUATOR_MODEL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match lookup("PUNCTUATOR_PROVIDER") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => Provider::OpenAi,
        };

        let (key_var, url_var, default_url, default_model) = match provider {
            Provider::OpenAi => (
                "OPENAI_API_KEY",
                "OPENAI_BASE_URL",
                DEFAULT_OPENAI_BASE_URL,
                DEFAULT_OPENAI_MODEL,
            ),
            Provider::Anthropic => (
                "ANTHROPIC_API_KEY",
                "ANTHROPIC_BASE_URL",
                DEFAULT_ANTHROPIC_BASE_URL,
                DEFAULT_ANTHROPIC_MODEL,
            ),
        };

        let api_key = lookup(key_var)
            .filter(|key| !key.trim().is_empty())
            .with_context(|| format!("{} environment variable not set", key_var))?;

        Ok(Self {
            provider,
            api_key,
            base_url: lookup(url_var).unwrap_or_else(|| default_url.to_string()),
            model: lookup("PUNCTUATOR_MODEL").unwrap_or_else(|| default_model.to_string()),
            temperature: 0.3,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        })
    }

    /// Override the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// `{base_url}/{path}` with exactly one slash in between
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Build the client for the configured provider
    pub fn build_client(&self) -> Result<Box<dyn CompletionClient>> {
        Ok(match self.provider {
            Provider::OpenAi => Box::new(OpenAiClient::new(self.clone())?),
            Provider::Anthropic => Box::new(AnthropicClient::new(self.clone())?),
        })
    }
}

/// Client for OpenAI-compatible chat completion endpoints
pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn build_request(&self, system: &str, user: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let endpoint = self.config.endpoint("chat/completions");
        let request = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.build_request(system, user));

        post_json::<ChatResponse>(request, &endpoint).await?.into_text()
    }

    fn name(&self) -> &str {
        "openai"
    }
}

pub(crate) fn http_client(config: &LlmConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .build()
        .context("Failed to create HTTP client for the completion service")
}

/// Send a prepared request and decode its JSON reply
pub(crate) async fn post_json<T: DeserializeOwned>(request: RequestBuilder, endpoint: &str) -> Result<T> {
    let response = request
        .send()
        .await
        .with_context(|| format!("Completion request to {} failed", endpoint))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read completion reply from {}", endpoint))?;
    decode_reply(endpoint, status, &body)
}

/// Non-2xx replies become an error carrying the status and body
fn decode_reply<T: DeserializeOwned>(endpoint: &str, status: StatusCode, body: &str) -> Result<T> {
    if !status.is_success() {
        anyhow::bail!("Completion service at {} returned {}: {}", endpoint, status, body.trim());
    }
    serde_json::from_str(body)
        .with_context(|| format!("Completion reply from {} is not the expected JSON", endpoint))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f64,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Message {
    pub(crate) role: String,
    pub(crate) content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .context("No text content in response")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = LlmConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.temperature, 0.3);
    }

    #[test]
    fn test_config_anthropic_overrides() {
        let config = LlmConfig::from_lookup(lookup_from(&[
            ("PUNCTUATOR_PROVIDER", "Anthropic"),
            ("ANTHROPIC_API_KEY", "key"),
            ("PUNCTUATOR_MODEL", "claude-test"),
        ]))
        .unwrap()
        .with_model("claude-other");

        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.base_url, DEFAULT_ANTHROPIC_BASE_URL);
        assert_eq!(config.model, "claude-other");
    }

    #[test]
    fn test_config_requires_key() {
        let err = LlmConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = LlmConfig::from_lookup(lookup_from(&[("PUNCTUATOR_PROVIDER", "gemini")]))
            .unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn test_endpoint_joins_path() {
        let config = LlmConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "k"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
        ]))
        .unwrap();
        assert_eq!(
            config.endpoint("chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body() {
        let config = LlmConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "k")])).unwrap();
        let client = OpenAiClient::new(config).unwrap();
        let request = client.build_request("sys", "[\"你好\"]");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], DEFAULT_OPENAI_MODEL);
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "[\"你好\"]");
    }

    #[test]
    fn test_chat_response_text() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "  [\"a。\"]\n"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "[\"a。\"]");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(empty.into_text().is_err());
    }

    #[test]
    fn test_decode_reply_errors_name_the_endpoint() {
        let endpoint = "https://llm.test/v1/chat/completions";

        let err = decode_reply::<ChatResponse>(endpoint, StatusCode::TOO_MANY_REQUESTS, "slow down\n")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Completion service at https://llm.test/v1/chat/completions returned 429 Too Many Requests: slow down"
        );

        let err = decode_reply::<ChatResponse>(endpoint, StatusCode::OK, "<html>").unwrap_err();
        assert!(err.to_string().starts_with("Completion reply from https://llm.test"));

        let reply: ChatResponse = decode_reply(
            endpoint,
            StatusCode::OK,
            r#"{"choices":[{"message":{"content":" [\"好。\"] "}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.into_text().unwrap(), r#"["好。"]"#);
    }
}

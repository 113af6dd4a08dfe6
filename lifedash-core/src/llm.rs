//! Chat-completion client used to voice the "future you" persona.
//!
//! Provides a `ChatBackend` trait with an OpenAI-compatible implementation.
//! Transient failures (transport errors, 429, 5xx) are retried with
//! exponential backoff; anything else is returned on the first attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::ChatSettings;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ============================================================================
// ChatBackend trait
// ============================================================================

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a system + user message pair and return the assistant's reply.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("No OPENAI_API_KEY found in environment or configuration.")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Response contained no message content")]
    EmptyResponse,

    #[error("All {attempts} attempts failed, last error: {last}")]
    RetryExhausted { attempts: usize, last: String },
}

impl LlmError {
    fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    pub timeout: Duration,
}

impl ChatConfig {
    /// Resolve the API key from `[chat] api_key`, then `OPENAI_API_KEY`.
    pub fn from_settings(settings: &ChatSettings) -> Self {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default();

        Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            max_retries: settings.max_retries,
            retry_delay_ms: settings.retry_delay_ms,
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }
}

// ============================================================================
// OpenAI API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiChatClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    config: ChatConfig,
}

impl OpenAiChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete_once(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = CompletionRequest {
            model: &self.config.model,
            messages: [
                WireMessage {
                    role: "system",
                    content: system,
                },
                WireMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Chat completion API error");

            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: CompletionResponse = response.json().await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms.max(1))
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let result = RetryIf::spawn(
            retry_strategy,
            || self.complete_once(system, user),
            |e: &LlmError| e.is_transient(),
        )
        .await;

        match result {
            Ok(answer) => {
                tracing::info!(model = %self.config.model, chars = answer.len(), "Chat completion received");
                Ok(answer)
            }
            Err(e) if e.is_transient() && self.config.max_retries > 0 => {
                let attempts = self.config.max_retries + 1;
                tracing::error!(attempts, error = %e, "All chat completion attempts failed");
                Err(LlmError::RetryExhausted {
                    attempts,
                    last: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str, base_url: String) -> ChatConfig {
        ChatConfig {
            api_key: api_key.to_string(),
            base_url,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 600,
            max_retries: 2,
            retry_delay_ms: 10,
            timeout: Duration::from_secs(5),
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_complete_sends_two_message_prompt() {
        let mock_server = MockServer::start().await;
        let client = OpenAiChatClient::new(test_config("sk-test", mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "be future me" },
                    { "role": "user", "content": "how am I doing?" }
                ],
                "temperature": 0.7,
                "max_tokens": 600
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("You're doing fine.")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let answer = client.complete("be future me", "how am I doing?").await.unwrap();
        assert_eq!(answer, "You're doing fine.");
    }

    #[tokio::test]
    async fn test_retries_on_429_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = OpenAiChatClient::new(test_config("sk-test", mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit reached", "type": "requests" }
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Keep going.")))
            .mount(&mock_server)
            .await;

        let answer = client.complete("s", "u").await.unwrap();
        assert_eq!(answer, "Keep going.");
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let mock_server = MockServer::start().await;
        let client = OpenAiChatClient::new(test_config("sk-test", mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": { "message": "overloaded" }
            })))
            .expect(3)
            .mount(&mock_server)
            .await;

        match client.complete("s", "u").await {
            Err(LlmError::RetryExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(last.contains("overloaded"), "last error was: {}", last);
            }
            other => panic!("Expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        let client = OpenAiChatClient::new(test_config("sk-bad", mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Incorrect API key provided" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.complete("s", "u").await {
            Err(LlmError::Api { code, message }) => {
                assert_eq!(code, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mock_server = MockServer::start().await;
        let client = OpenAiChatClient::new(test_config("sk-test", mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let result = client.complete("s", "u").await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_missing_api_key() {
        let result = OpenAiChatClient::new(test_config("", DEFAULT_BASE_URL.to_string()));
        match result {
            Err(e @ LlmError::MissingApiKey) => {
                assert_eq!(
                    e.to_string(),
                    "No OPENAI_API_KEY found in environment or configuration."
                );
            }
            _ => panic!("Expected MissingApiKey error"),
        }
    }

    #[test]
    fn test_config_prefers_explicit_key_and_trims_base_url() {
        let settings = ChatSettings {
            api_key: Some("sk-from-file".to_string()),
            base_url: "http://localhost:9999/v1/".to_string(),
            ..ChatSettings::default()
        };
        let config = ChatConfig::from_settings(&settings);
        assert_eq!(config.api_key, "sk-from-file");
        assert_eq!(config.base_url, "http://localhost:9999/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 600);
    }
}

//! Groq chat-completion client.
//!
//! Thin wrapper over the hosted OpenAI-compatible endpoint. Sampling
//! parameters vary per assistant mode, so they travel with each call rather
//! than living on the client.

use crate::error::ApiError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Sampling parameters for a single completion call.
#[derive(Debug, Clone, Copy)]
pub struct ChatParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Groq client for chat completions.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqClient {
    /// Create a new client, reading API key from GROQ_API_KEY env var.
    /// GROQ_MODEL and GROQ_API_URL override the defaults.
    pub fn from_env() -> Result<Self> {
        let api_key =
            env::var("GROQ_API_KEY").context("GROQ_API_KEY environment variable not set")?;
        let model = env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url = env::var("GROQ_API_URL").unwrap_or_else(|_| GROQ_API_URL.to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model,
            base_url,
        })
    }

    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    /// Send a chat completion request and return the assistant's text.
    pub async fn chat(&self, messages: Vec<Message>, params: ChatParams) -> Result<String, ApiError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: false,
        };

        debug!("Sending request to Groq: model={}", request.model);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to send request to Groq: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to parse Groq response: {e}")))?;

        if let Some(usage) = &response.usage {
            info!(
                "Groq response: {} tokens (prompt: {}, completion: {})",
                usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            );
        }

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ApiError::EmptyResponse);
        }

        Ok(content)
    }
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// ============================================================================
// Message types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    const PARAMS: ChatParams = ChatParams {
        temperature: 0.7,
        max_tokens: 2000,
    };

    #[tokio::test]
    async fn chat_returns_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .json_body_partial(r#"{"model": "test-model", "stream": false}"#);
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "hello" } }],
                    "usage": { "prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12 }
                }));
            })
            .await;

        let client = GroqClient::new("test-key", "test-model", server.url("/chat/completions"));
        let content = client
            .chat(vec![Message::user("hi")], PARAMS)
            .await
            .expect("chat should succeed");

        mock.assert_async().await;
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn chat_surfaces_upstream_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let client = GroqClient::new("test-key", "test-model", server.url("/chat/completions"));
        let err = client
            .chat(vec![Message::user("hi")], PARAMS)
            .await
            .expect_err("should fail");

        match err {
            crate::error::ApiError::Upstream { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_rejects_empty_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "" } }]
                }));
            })
            .await;

        let client = GroqClient::new("test-key", "test-model", server.url("/chat/completions"));
        let err = client
            .chat(vec![Message::user("hi")], PARAMS)
            .await
            .expect_err("should fail");
        assert!(matches!(err, crate::error::ApiError::EmptyResponse));
    }
}

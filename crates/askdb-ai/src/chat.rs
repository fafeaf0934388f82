//! Chat model providers
//!
//! A [`ChatModel`] turns a list of role-tagged messages into a single text
//! completion. [`OpenAiChat`] talks to any endpoint that speaks the OpenAI
//! chat completions protocol.

use crate::error::{AiError, AiResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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

/// Metadata about a chat provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// Display name (e.g. "OpenAI")
    pub name: String,
    /// Model identifier sent with each request
    pub model: String,
}

impl ProviderMetadata {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// Language model that answers a conversation with one completion.
///
/// Implement this trait to plug in another backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation, returning the assistant's reply text
    async fn complete(&self, messages: &[ChatMessage]) -> AiResult<String>;

    fn metadata(&self) -> ProviderMetadata;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Box<T> {
    async fn complete(&self, messages: &[ChatMessage]) -> AiResult<String> {
        (**self).complete(messages).await
    }

    fn metadata(&self) -> ProviderMetadata {
        (**self).metadata()
    }
}

/// Settings for [`OpenAiChat`]
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    /// Base URL without the trailing `/chat/completions`
    pub base_url: String,
    pub max_tokens: Option<u32>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: 0.7,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// OpenAI chat completions client
pub struct OpenAiChat {
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    endpoint: String,
    client: Client,
}

// Manual Debug so the key never lands in logs
impl std::fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("model", &self.model)
            .field("base_url", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiChat {
    pub fn new(config: OpenAiConfig) -> AiResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::Configuration(
                "OpenAI API key is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AiError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            endpoint: chat_completions_url(&config.base_url),
            client,
        })
    }

    fn request<'a>(&'a self, messages: &'a [ChatMessage]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn into_text(self) -> AiResult<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AiError::InvalidResponse("No completion choices returned".to_string()))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    #[tracing::instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> AiResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(messages))
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AiError::Authentication("Invalid OpenAI API key".to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited("Rate limit exceeded".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "chat completion request failed");
            return Err(AiError::InvalidResponse(format!("Status {}: {}", status, body)));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        let text = response.into_text()?;
        tracing::debug!(chars = text.len(), "chat completion received");
        Ok(text)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new("OpenAI", &self.model)
    }
}

//! OpenAI-compatible chat-completion provider
//!
//! Speaks the `/chat/completions` wire format, which Groq, OpenAI and most
//! self-hosted servers (vLLM, llama.cpp, LM Studio) all accept.
//!
//! ```no_run
//! use finsight_llm::{CompletionRequest, LlmProvider, Message};
//! use finsight_llm::providers::{OpenAICompatConfig, OpenAICompatProvider};
//!
//! # async fn example() -> finsight_llm::Result<()> {
//! let provider = OpenAICompatProvider::with_config(OpenAICompatConfig::groq("gsk-..."))?;
//! let request = CompletionRequest::builder("llama3-8b-8192")
//!     .add_message(Message::user("Summarise AAPL's last week"))
//!     .temperature(0.3)
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{}", response.message.content);
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, LlmError, LlmProvider, Message, Result, Role,
    StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Groq's OpenAI-compatible endpoint
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
/// OpenAI's public endpoint
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for [`OpenAICompatProvider`]
#[derive(Debug, Clone)]
pub struct OpenAICompatConfig {
    /// Provider label used in logs
    pub name: String,

    /// Bearer token
    pub api_key: String,

    /// Base URL, without the trailing `/chat/completions`
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAICompatConfig {
    /// Config for OpenAI with the given key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "openai".to_string(),
            api_key: api_key.into(),
            api_base: OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Config for Groq with the given key
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            name: "groq".to_string(),
            api_base: GROQ_API_BASE.to_string(),
            ..Self::new(api_key)
        }
    }

    /// Create config from environment variables
    ///
    /// `GROQ_API_KEY` selects Groq. Otherwise `OPENAI_API_KEY` is used together
    /// with an optional `OPENAI_API_BASE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GROQ_API_KEY").filter(|k| !k.is_empty()) {
            return Ok(Self::groq(key));
        }

        let api_key = lookup("OPENAI_API_KEY").ok_or_else(|| {
            LlmError::ConfigurationError(
                "neither GROQ_API_KEY nor OPENAI_API_KEY is set".to_string(),
            )
        })?;
        let mut config = Self::new(api_key);
        if let Some(base) = lookup("OPENAI_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Provider for any OpenAI-compatible chat endpoint
pub struct OpenAICompatProvider {
    client: Client,
    config: OpenAICompatConfig,
}

impl OpenAICompatProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OpenAICompatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(OpenAICompatConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAICompatConfig {
        &self.config
    }
}

#[async_trait]
impl LlmProvider for OpenAICompatProvider {
    #[instrument(skip(self, request), fields(provider = %self.config.name, model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.clone();
        let body = ChatRequest::from(request);

        debug!(messages = body.messages.len(), "sending chat completion");

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthenticationFailed,
                429 => LlmError::RateLimitExceeded(error_text),
                400 | 422 => LlmError::InvalidRequest(error_text),
                404 => LlmError::ModelNotFound(model),
                _ => LlmError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        let completion = chat.into_completion()?;
        debug!(
            stop_reason = ?completion.stop_reason,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "chat completion received"
        );
        Ok(completion)
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl From<CompletionRequest> for ChatRequest {
    fn from(request: CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: Role::System.as_str().to_string(),
                content: Some(system),
            });
        }
        messages.extend(request.messages.into_iter().map(|m| ChatMessage {
            role: m.role.as_str().to_string(),
            content: Some(m.content),
        }));

        Self {
            model: request.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl ChatResponse {
    fn into_completion(self) -> Result<CompletionResponse> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::UnexpectedResponse("No choices in response".to_string()))?;

        let usage = self
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            stop_reason: map_stop_reason(choice.finish_reason.as_deref()),
            usage,
        })
    }
}

fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}

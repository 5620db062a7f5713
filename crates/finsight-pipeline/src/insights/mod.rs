//! Narrative market commentary

pub mod prompt;

pub use prompt::render_prompt;

use crate::config::NarrativeConfig;
use crate::error::NarrativeError;
use crate::features::FeatureRow;
use async_trait::async_trait;
use finsight_llm::{CompletionRequest, LlmProvider, Message};
use std::sync::Arc;
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You are a financial analyst. Write clear, balanced commentary \
for retail investors and flag uncertainty in the forecast.";

/// Produces prose about recent prices and a forecast
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Summarize `recent_rows` and the upcoming `forecast_values`
    async fn summarize(
        &self,
        recent_rows: &[FeatureRow],
        forecast_values: &[f64],
    ) -> Result<String, NarrativeError>;
}

/// Narrator backed by a chat-completion provider
pub struct LlmNarrator {
    provider: Arc<dyn LlmProvider>,
    config: NarrativeConfig,
}

impl LlmNarrator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: NarrativeConfig) -> Self {
        Self { provider, config }
    }

    fn request(&self, prompt: String) -> CompletionRequest {
        let builder = CompletionRequest::builder(&self.config.model)
            .system(SYSTEM_PROMPT)
            .add_message(Message::user(prompt))
            .temperature(self.config.temperature);

        match self.config.max_tokens {
            Some(max_tokens) => builder.max_tokens(max_tokens),
            None => builder,
        }
        .build()
    }
}

#[async_trait]
impl Narrator for LlmNarrator {
    #[instrument(skip_all, fields(provider = self.provider.name(), model = %self.config.model))]
    async fn summarize(
        &self,
        recent_rows: &[FeatureRow],
        forecast_values: &[f64],
    ) -> Result<String, NarrativeError> {
        let prompt = render_prompt(recent_rows, forecast_values)?;
        debug!(rows = recent_rows.len(), prompt_chars = prompt.len(), "requesting insights");

        let response = self.provider.complete(self.request(prompt)).await?;
        debug!(
            stop_reason = ?response.stop_reason,
            tokens = response.usage.total(),
            "insights received"
        );

        response
            .message
            .text()
            .map(str::to_string)
            .ok_or(NarrativeError::EmptyResponse)
    }
}

//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A chat-completion backend
///
/// Implementations are shared across concurrent requests behind an `Arc`, so
/// they must not keep per-call mutable state.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `request`
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Short provider identifier used in logs (e.g. "groq", "openai")
    fn name(&self) -> &str;
}

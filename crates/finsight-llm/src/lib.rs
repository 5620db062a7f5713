//! Chat-completion abstraction for finsight
//!
//! The pipeline only needs "given a prompt, produce prose", so this crate keeps
//! the surface small:
//!
//! - [`Message`] / [`Role`] for the conversation
//! - [`CompletionRequest`] / [`CompletionResponse`] for a single call
//! - [`LlmProvider`], the trait the narrative stage depends on
//! - [`providers::OpenAICompatProvider`], an HTTP implementation for any
//!   `/chat/completions` endpoint (Groq, OpenAI, local servers)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;

pub use completion::{CompletionRequest, CompletionRequestBuilder, CompletionResponse, StopReason, TokenUsage};
pub use error::{LlmError, Result};
pub use messages::{Message, Role};
pub use provider::LlmProvider;

//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur while talking to a completion endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    /// Non-success HTTP status not covered by a more specific variant
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The endpoint rejected the request body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// HTTP transport error, including client-side timeouts
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The body did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Missing or malformed provider settings
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LlmError {
    /// Whether the failure came from a transport timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HttpError(e) if e.is_timeout())
    }
}

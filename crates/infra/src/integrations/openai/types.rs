//! Chat completions wire types and errors

use mealscribe_domain::MealscribeError;
use serde::{Deserialize, Serialize};

/// Completion client error types
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Network-level error (connection failed, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// The API returned an error response
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded; retry after the given seconds
    #[error("Rate limit exceeded (retry after {0}s)")]
    RateLimit(u64),

    /// Authentication failed (invalid API key)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The completion text could not be turned into food items
    #[error(transparent)]
    Parse(#[from] CompletionParseError),
}

/// Why a completion could not be read as a list of food items
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionParseError {
    #[error("response body is not a chat completion: {0}")]
    InvalidBody(String),

    #[error("response contained no choices")]
    NoChoices,

    /// No JSON array anywhere in the completion text
    #[error("completion contains no JSON list: {excerpt}")]
    NoJsonArray { excerpt: String },

    #[error("completion list has invalid items: {0}")]
    InvalidItems(String),
}

impl From<CompletionError> for MealscribeError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::Authentication(_) => Self::Auth(err.to_string()),
            CompletionError::Parse(_) => Self::Parse(err.to_string()),
            CompletionError::Api { status: 400, .. } => Self::InvalidInput(err.to_string()),
            CompletionError::Network(_)
            | CompletionError::Api { .. }
            | CompletionError::RateLimit(_) => Self::Network(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub total_tokens: u32,
}

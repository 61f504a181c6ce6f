//! Chat completions client for meal interpretation

use async_trait::async_trait;
use mealscribe_core::MealInterpreter;
use mealscribe_domain::{CompletionConfig, FoodItem};
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Response};
use tracing::{debug, info, warn};

use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CompletionError,
    CompletionParseError,
};
use crate::http::HttpClient;

const PROMPT_TEMPLATE: &str = "Ich werde dir gleich eine Beschreibung meines Essens geben. \
Bitte schreibe mir die einzelnen Bestandteile der Mahlzeit als JSON-Liste auf. \
Jeder Eintrag der Liste sollte folgende Felder beinhalten: Einheit, Name des Bestandteils, Menge\n\
Die Beschreibung ist: ";

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
const MAX_EXCERPT_CHARS: usize = 120;

/// Client for an OpenAI-compatible chat completions endpoint
pub struct CompletionClient {
    http_client: HttpClient,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Create a new completion client
    ///
    /// # Arguments
    /// * `config` - API key, endpoint, model and sampling settings
    /// * `http_client` - HTTP client with retry logic
    pub fn new(config: CompletionConfig, http_client: HttpClient) -> Self {
        Self { http_client, config }
    }

    /// Override the endpoint (for testing)
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Split a meal description into food items
    ///
    /// Blank input returns an empty list without calling the API.
    ///
    /// # Errors
    /// `Parse` when the completion text is not a list of food items; the
    /// other [`CompletionError`] variants for transport and API failures.
    pub async fn interpret(&self, description: &str) -> Result<Vec<FoodItem>, CompletionError> {
        let description = description.trim();
        if description.is_empty() {
            return Ok(Vec::new());
        }

        info!(model = %self.config.model, "interpreting meal description");

        let content = self.complete(build_prompt(description)).await?;
        let items = parse_food_items(&content)?;

        info!(items = items.len(), "meal interpreted");
        Ok(items)
    }

    /// Call the chat completions API and return the first choice's text
    async fn complete(&self, prompt: String) -> Result<String, CompletionError> {
        let request_payload = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let request_builder = self
            .http_client
            .request(Method::POST, &self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request_payload);

        let response = self
            .http_client
            .send(request_builder)
            .await
            .map_err(|err| CompletionError::Network(err.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "received completion response");

        if !status.is_success() {
            return Err(handle_error_status(status.as_u16(), response).await);
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionParseError::InvalidBody(e.to_string()))?;

        if let Some(usage) = &chat_response.usage {
            debug!(tokens = usage.total_tokens, "completion token usage");
        }

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| CompletionParseError::NoChoices.into())
    }
}

/// Map an error status to a [`CompletionError`]
async fn handle_error_status(status: u16, response: Response) -> CompletionError {
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    warn!(status, "completion API error");
    match status {
        401 | 403 => CompletionError::Authentication(format!("Invalid API key ({status})")),
        429 => CompletionError::RateLimit(retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
        _ => CompletionError::Api { status, message },
    }
}

fn build_prompt(description: &str) -> String {
    format!("{PROMPT_TEMPLATE}{description}")
}

/// Read the first JSON array in `content` as food items
fn parse_food_items(content: &str) -> Result<Vec<FoodItem>, CompletionParseError> {
    let mut last_error = None;
    for candidate in json_array_candidates(content) {
        match serde_json::from_str(candidate) {
            Ok(items) => return Ok(items),
            Err(e) => last_error = Some(e),
        }
    }

    match last_error {
        Some(e) => Err(CompletionParseError::InvalidItems(e.to_string())),
        None => Err(CompletionParseError::NoJsonArray {
            excerpt: content.chars().take(MAX_EXCERPT_CHARS).collect(),
        }),
    }
}

/// Every balanced `[...]` in the reply, in order of its opening bracket
///
/// Prose like "see [1]" may precede the list, so callers try each one.
fn json_array_candidates(content: &str) -> impl Iterator<Item = &str> {
    content
        .char_indices()
        .filter(|&(_, ch)| ch == '[')
        .filter_map(move |(start, _)| balanced_array_at(content, start))
}

/// Slice of the balanced `[...]` opening at `start`, ignoring brackets inside
/// JSON strings
fn balanced_array_at(content: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

#[async_trait]
impl MealInterpreter for CompletionClient {
    async fn interpret(&self, description: &str) -> mealscribe_domain::Result<Vec<FoodItem>> {
        Self::interpret(self, description).await.map_err(Into::into)
    }
}

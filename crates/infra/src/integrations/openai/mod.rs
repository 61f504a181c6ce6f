//! Meal interpretation through an OpenAI-compatible chat completions API
//!
//! [`CompletionClient`] turns a free-text meal description into
//! [`FoodItem`](mealscribe_domain::FoodItem)s and implements
//! [`MealInterpreter`](mealscribe_core::MealInterpreter).
//!
//! # Usage
//!
//! ```no_run
//! use mealscribe_domain::CompletionConfig;
//! use mealscribe_infra::http::HttpClient;
//! use mealscribe_infra::integrations::openai::CompletionClient;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http_client = HttpClient::new()?;
//! let config = CompletionConfig::new(std::env::var("OPENAI_API_KEY")?);
//! let client = CompletionClient::new(config, http_client);
//!
//! let items = client.interpret("Zwei Scheiben Vollkornbrot mit Butter").await?;
//! for item in &items {
//!     println!("{} {} {}", item.amount, item.unit, item.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - **Network errors / 5xx**: retried by `HttpClient`, then `Network`
//! - **401 / 403**: `Authentication`
//! - **429**: `RateLimit` with the `Retry-After` delay (60 s if absent)
//! - **Unreadable completion text**: `Parse`, never retried

pub mod client;
pub mod types;

pub use client::CompletionClient;
pub use types::{CompletionError, CompletionParseError};

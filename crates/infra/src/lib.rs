//! # MealScribe Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The retrying HTTP client shared by every integration
//! - Configuration loading from the environment and config files
//! - The Fitbit food client and the OpenAI completion client
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `mealscribe-core`
//! - Takes credentials only through `mealscribe_common::auth::AuthProvider`
//! - Contains all "impure" code (I/O, network)

pub mod config;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;

pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::fitbit::{FitbitFoodClient, FoodApiError};
pub use integrations::openai::{CompletionClient, CompletionError, CompletionParseError};

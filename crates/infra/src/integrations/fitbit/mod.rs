//! Fitbit food database and food diary
//!
//! [`FitbitFoodClient`] implements [`FoodProvider`](mealscribe_core::FoodProvider)
//! on top of the Fitbit Web API. It never stores credentials: every request
//! asks the injected [`AuthProvider`](mealscribe_common::auth::AuthProvider)
//! for the current token, so a logout takes effect on the next call.
//!
//! # Endpoints
//!
//! - `GET  {api}/1/foods/search.json?query=…`
//! - `POST {api}/1/user/-/foods/log.json` (form-encoded)

pub mod client;
pub mod types;

pub use client::FitbitFoodClient;
pub use types::FoodApiError;

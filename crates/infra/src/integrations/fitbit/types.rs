//! Fitbit food API wire types and errors

use mealscribe_domain::{FoodChoice, MealscribeError};
use serde::Deserialize;

/// Fitbit food API error types
#[derive(Debug, thiserror::Error)]
pub enum FoodApiError {
    /// No unexpired session; the request was not sent
    #[error("not signed in to Fitbit")]
    NotAuthenticated,

    /// The provider rejected the token (401)
    #[error("Fitbit rejected the access token")]
    Unauthorized,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Body doesn't match the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    Network(String),
}

impl From<FoodApiError> for MealscribeError {
    fn from(err: FoodApiError) -> Self {
        match err {
            FoodApiError::NotAuthenticated | FoodApiError::Unauthorized => {
                Self::Auth(err.to_string())
            }
            FoodApiError::InvalidResponse(_) => Self::Parse(err.to_string()),
            FoodApiError::Api { status: 404, .. } => Self::NotFound(err.to_string()),
            FoodApiError::Api { status: 400, .. } => Self::InvalidInput(err.to_string()),
            FoodApiError::Api { .. } | FoodApiError::Network(_) => Self::Network(err.to_string()),
        }
    }
}

/// `GET /1/foods/search.json` response
#[derive(Debug, Deserialize)]
pub(crate) struct FoodSearchResponse {
    #[serde(default)]
    pub foods: Vec<FoodRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FoodRecord {
    pub food_id: u64,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub default_unit: UnitRecord,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnitRecord {
    pub id: u64,
}

impl From<FoodRecord> for FoodChoice {
    fn from(record: FoodRecord) -> Self {
        Self {
            id: record.food_id.to_string(),
            name: record.name,
            brand: record.brand.unwrap_or_default(),
            unit_id: record.default_unit.id.to_string(),
        }
    }
}

//! Conversions from external infrastructure errors into domain errors.

use mealscribe_common::auth::{StoreError, TokenExtractionError};
use mealscribe_domain::MealscribeError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MealscribeError);

impl From<InfraError> for MealscribeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MealscribeError> for InfraError {
    fn from(value: MealscribeError) -> Self {
        Self(value)
    }
}

trait IntoMealscribeError {
    fn into_mealscribe(self) -> MealscribeError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → MealscribeError */
/* -------------------------------------------------------------------------- */

impl IntoMealscribeError for HttpError {
    fn into_mealscribe(self) -> MealscribeError {
        if self.is_builder() {
            return MealscribeError::Internal(format!("invalid HTTP request: {self}"));
        }
        if self.is_timeout() {
            return MealscribeError::Network(format!("HTTP request timed out: {self}"));
        }
        if self.is_decode() {
            return MealscribeError::Parse(format!("HTTP response body invalid: {self}"));
        }
        MealscribeError::Network(format!("HTTP request failed: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_mealscribe())
    }
}

/* -------------------------------------------------------------------------- */
/* auth errors → MealscribeError */
/* -------------------------------------------------------------------------- */

impl IntoMealscribeError for StoreError {
    fn into_mealscribe(self) -> MealscribeError {
        MealscribeError::Storage(self.to_string())
    }
}

impl From<StoreError> for InfraError {
    fn from(value: StoreError) -> Self {
        Self(value.into_mealscribe())
    }
}

impl IntoMealscribeError for TokenExtractionError {
    fn into_mealscribe(self) -> MealscribeError {
        match self {
            TokenExtractionError::Storage(err) => err.into_mealscribe(),
            TokenExtractionError::Exchange(err) => MealscribeError::Network(err.to_string()),
            other => MealscribeError::Auth(other.to_string()),
        }
    }
}

impl From<TokenExtractionError> for InfraError {
    fn from(value: TokenExtractionError) -> Self {
        Self(value.into_mealscribe())
    }
}
